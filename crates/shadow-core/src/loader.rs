//! Document loaders: the filesystem pair used in production and an in-memory
//! variant for tests and demos.
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::DataSettings;
use crate::error::{Error, Result};
use crate::traits::DocumentLoader;
use crate::types::{DocType, Document};

#[derive(Debug, Clone)]
pub struct DocumentSource {
    pub name: String,
    pub path: PathBuf,
    pub doc_type: DocType,
}

/// Loads the classified manual and the response framework from disk.
pub struct FsDocumentLoader {
    sources: [DocumentSource; 2],
}

impl FsDocumentLoader {
    pub fn new(manual: DocumentSource, framework: DocumentSource) -> Self { Self { sources: [manual, framework] } }

    pub fn from_settings(data: &DataSettings) -> Self {
        Self::new(
            DocumentSource { name: data.manual_name.clone(), path: data.manual_path.clone(), doc_type: DocType::Classified },
            DocumentSource { name: data.framework_name.clone(), path: data.framework_path.clone(), doc_type: DocType::Framework },
        )
    }
}

impl DocumentLoader for FsDocumentLoader {
    fn load(&self) -> Result<Vec<Document>> {
        // Both documents must exist before either is read.
        for source in &self.sources {
            if !source.path.is_file() {
                tracing::error!(document = %source.name, path = %source.path.display(), "document not found");
                return Err(Error::NotFound(source.path.display().to_string()));
            }
        }
        let mut documents = Vec::with_capacity(self.sources.len());
        for source in &self.sources {
            let content = read_file_content(&source.path)?;
            tracing::info!(document = %source.name, bytes = content.len(), "document loaded");
            documents.push(Document {
                name: source.name.clone(),
                content,
                doc_type: source.doc_type,
                path: source.path.clone(),
            });
        }
        Ok(documents)
    }
}

fn read_file_content(path: &Path) -> Result<String> {
    let read_err = |source| Error::Read { path: path.display().to_string(), source };
    match fs::read_to_string(path) {
        Ok(content) => Ok(content),
        Err(e) if e.kind() == std::io::ErrorKind::InvalidData => {
            tracing::warn!(path = %path.display(), "document is not valid UTF-8; decoding lossily");
            Ok(String::from_utf8_lossy(&fs::read(path).map_err(read_err)?).to_string())
        }
        Err(e) => Err(read_err(e)),
    }
}

/// Serves documents held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLoader {
    documents: Vec<Document>,
}

impl InMemoryLoader {
    pub fn new() -> Self { Self::default() }

    pub fn with_document(mut self, name: &str, doc_type: DocType, content: &str) -> Self {
        self.documents.push(Document {
            name: name.to_string(),
            content: content.to_string(),
            doc_type,
            path: PathBuf::from(format!("memory://{name}")),
        });
        self
    }
}

impl DocumentLoader for InMemoryLoader {
    fn load(&self) -> Result<Vec<Document>> {
        if self.documents.is_empty() {
            return Err(Error::NotFound("no in-memory documents registered".into()));
        }
        Ok(self.documents.clone())
    }
}
