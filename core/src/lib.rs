//! Patient summary retrieval: FHIR loading, summary construction and a TF-IDF
//! index for ranking summaries against free-text queries.

pub mod error;
pub mod evaluation;
pub mod fhir;
pub mod index;
pub mod summary;
pub mod tokenizer;

pub use error::{Error, Result};
pub use index::{DocId, Hit, IndexOptions, RetrievalIndex, SparseVector, TermId, TopK, Vocabulary};
pub use summary::{PatientSummary, SummaryStore};
