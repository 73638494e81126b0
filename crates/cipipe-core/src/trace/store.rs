use std::cell::{Cell, RefCell};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use log::debug;

use super::TraceDocument;
use crate::errors::CoreEngineError;

/// Persistencia de un único documento de traza (read/modify/write completo).
///
/// Se asume un solo escritor por documento: el engine no bloquea ficheros ni
/// aísla escritores concurrentes.
pub trait TraceStore {
    /// Lee el documento completo; `{}` si todavía no existe.
    fn read_trace(&self) -> Result<TraceDocument, CoreEngineError>;
    /// Reemplaza el documento completo.
    fn write_trace(&self, document: &TraceDocument) -> Result<(), CoreEngineError>;
    /// `true` si el documento no tiene ramas.
    fn is_empty(&self) -> Result<bool, CoreEngineError> {
        Ok(self.read_trace()?.is_empty())
    }
    /// Raíz bajo la que se crean las carpetas de los steps.
    fn root_dir(&self) -> &Path;
}

/// Store en memoria. Los clones comparten el mismo documento, igual que dos
/// handles sobre el mismo fichero.
#[derive(Debug, Clone)]
pub struct InMemoryTraceStore {
    root: PathBuf,
    inner: Rc<RefCell<TraceDocument>>,
    reads: Rc<Cell<usize>>,
    writes: Rc<Cell<usize>>,
}

impl InMemoryTraceStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_document(root, TraceDocument::default())
    }

    pub fn with_document(root: impl Into<PathBuf>, document: TraceDocument) -> Self {
        Self { root: root.into(),
               inner: Rc::new(RefCell::new(document)),
               reads: Rc::new(Cell::new(0)),
               writes: Rc::new(Cell::new(0)) }
    }

    /// Copia del documento actual (no cuenta como lectura).
    pub fn snapshot(&self) -> TraceDocument {
        self.inner.borrow().clone()
    }

    pub fn reads(&self) -> usize {
        self.reads.get()
    }

    pub fn writes(&self) -> usize {
        self.writes.get()
    }
}

impl TraceStore for InMemoryTraceStore {
    fn read_trace(&self) -> Result<TraceDocument, CoreEngineError> {
        self.reads.set(self.reads.get() + 1);
        Ok(self.inner.borrow().clone())
    }

    fn write_trace(&self, document: &TraceDocument) -> Result<(), CoreEngineError> {
        self.writes.set(self.writes.get() + 1);
        debug!("in-memory trace write #{}", self.writes.get());
        *self.inner.borrow_mut() = document.clone();
        Ok(())
    }

    fn root_dir(&self) -> &Path {
        &self.root
    }
}
