use crate::error::Error;
use crate::tokenizer::{Tokenizer, TokenizerOptions};
use std::collections::{BTreeMap, HashMap};

pub type TermId = u32;
pub type DocId = usize;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexOptions {
    pub tokenizer: TokenizerOptions,
    /// Use `1 + ln(tf)` instead of the raw count.
    pub sublinear_tf: bool,
}

/// Number of ranked results requested by a caller. Negative requests are a
/// programming error and are rejected instead of clamped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TopK(usize);

impl TopK {
    pub fn get(self) -> usize {
        self.0
    }
}

impl Default for TopK {
    fn default() -> Self {
        TopK(1)
    }
}

impl From<usize> for TopK {
    fn from(k: usize) -> Self {
        TopK(k)
    }
}

impl TryFrom<i64> for TopK {
    type Error = Error;

    fn try_from(k: i64) -> Result<Self, Self::Error> {
        usize::try_from(k).map(TopK).map_err(|_| Error::InvalidTopK(k))
    }
}

/// Sparse row vector: parallel arrays sorted by term id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SparseVector {
    pub indices: Vec<TermId>,
    pub values: Vec<f32>,
}

impl SparseVector {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build from unordered `(term, weight)` pairs and L2-normalize. Collapses
    /// to the empty vector when the norm is zero.
    fn normalized(mut pairs: Vec<(TermId, f32)>) -> Self {
        pairs.retain(|(_, w)| *w > 0.0);
        pairs.sort_by_key(|(t, _)| *t);
        let norm = pairs.iter().map(|(_, w)| w * w).sum::<f32>().sqrt();
        if norm == 0.0 || !norm.is_finite() {
            return Self::empty();
        }
        let (indices, values) = pairs.into_iter().map(|(t, w)| (t, w / norm)).unzip();
        Self { indices, values }
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn norm(&self) -> f32 {
        self.values.iter().map(|v| v * v).sum::<f32>().sqrt()
    }

    /// Merge-join dot product over the shared term ids.
    pub fn dot(&self, other: &SparseVector) -> f32 {
        let (mut i, mut j) = (0, 0);
        let mut sum = 0.0f32;
        while i < self.indices.len() && j < other.indices.len() {
            match self.indices[i].cmp(&other.indices[j]) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    sum += self.values[i] * other.values[j];
                    i += 1;
                    j += 1;
                }
            }
        }
        sum
    }
}

/// Terms seen at build time, numbered in lexicographic order, with their frozen IDF.
#[derive(Debug, Clone, Default)]
pub struct Vocabulary {
    terms: HashMap<String, TermId>,
    idf: Vec<f32>,
}

impl Vocabulary {
    pub fn len(&self) -> usize {
        self.idf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.idf.is_empty()
    }

    pub fn term_id(&self, term: &str) -> Option<TermId> {
        self.terms.get(term).copied()
    }

    pub fn idf(&self, term_id: TermId) -> Option<f32> {
        self.idf.get(term_id as usize).copied()
    }
}

/// Smoothed inverse document frequency: `ln((n + 1) / (df + 1)) + 1`.
pub fn smoothed_idf(num_docs: usize, df: usize) -> f32 {
    (((num_docs + 1) as f64 / (df + 1) as f64).ln() + 1.0) as f32
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit<'a> {
    pub doc_id: DocId,
    pub document: &'a str,
    pub score: f32,
}

/// Immutable TF-IDF index over an ordered document collection. Built once;
/// a changed collection needs a fresh index.
#[derive(Debug, Clone)]
pub struct RetrievalIndex {
    documents: Vec<String>,
    tokenizer: Tokenizer,
    sublinear_tf: bool,
    vocabulary: Vocabulary,
    rows: Vec<SparseVector>,
}

impl RetrievalIndex {
    pub fn build<I, S>(documents: I, options: &IndexOptions) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let documents: Vec<String> = documents.into_iter().map(Into::into).collect();
        let tokenizer = Tokenizer::new(options.tokenizer.clone());

        let counts: Vec<HashMap<String, u32>> = documents
            .iter()
            .map(|doc| {
                let mut tf: HashMap<String, u32> = HashMap::new();
                for term in tokenizer.tokenize(doc) {
                    *tf.entry(term).or_insert(0) += 1;
                }
                tf
            })
            .collect();

        let mut df: BTreeMap<&str, usize> = BTreeMap::new();
        for tf in &counts {
            for term in tf.keys() {
                *df.entry(term.as_str()).or_insert(0) += 1;
            }
        }

        let n = documents.len();
        let mut terms = HashMap::with_capacity(df.len());
        let mut idf = Vec::with_capacity(df.len());
        for (tid, (term, df_t)) in df.into_iter().enumerate() {
            terms.insert(term.to_string(), tid as TermId);
            idf.push(smoothed_idf(n, df_t));
        }
        let vocabulary = Vocabulary { terms, idf };

        let rows = counts
            .iter()
            .map(|tf| {
                let pairs = tf
                    .iter()
                    .filter_map(|(term, &raw)| {
                        let tid = vocabulary.term_id(term)?;
                        Some((tid, weight_tf(raw, options.sublinear_tf) * vocabulary.idf[tid as usize]))
                    })
                    .collect();
                SparseVector::normalized(pairs)
            })
            .collect();

        tracing::debug!(num_docs = n, num_terms = vocabulary.len(), "built retrieval index");
        Self { documents, tokenizer, sublinear_tf: options.sublinear_tf, vocabulary, rows }
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    pub fn document(&self, doc_id: DocId) -> Option<&str> {
        self.documents.get(doc_id).map(String::as_str)
    }

    pub fn row(&self, doc_id: DocId) -> Option<&SparseVector> {
        self.rows.get(doc_id)
    }

    /// Encode a query with the build-time tokenizer and IDF. Returns the empty
    /// vector when nothing in the query is in the vocabulary.
    pub fn encode_query(&self, text: &str) -> SparseVector {
        let mut tf: HashMap<TermId, u32> = HashMap::new();
        for term in self.tokenizer.tokenize(text) {
            if let Some(tid) = self.vocabulary.term_id(&term) {
                *tf.entry(tid).or_insert(0) += 1;
            }
        }
        let pairs = tf
            .into_iter()
            .map(|(tid, raw)| (tid, weight_tf(raw, self.sublinear_tf) * self.vocabulary.idf[tid as usize]))
            .collect();
        SparseVector::normalized(pairs)
    }

    /// Score every document by cosine similarity and keep the best `top_k`.
    /// Equal scores keep document order.
    pub fn rank(&self, query: &SparseVector, top_k: TopK) -> Vec<(DocId, f32)> {
        if query.is_empty() || self.rows.is_empty() || top_k.get() == 0 {
            return Vec::new();
        }
        let mut scored: Vec<(DocId, f32)> = self
            .rows
            .iter()
            .enumerate()
            .map(|(doc_id, row)| (doc_id, query.dot(row).clamp(0.0, 1.0)))
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(top_k.get());
        scored
    }

    pub fn query(&self, text: &str, top_k: TopK) -> Vec<Hit<'_>> {
        let q = self.encode_query(text);
        self.rank(&q, top_k)
            .into_iter()
            .map(|(doc_id, score)| Hit { doc_id, document: &self.documents[doc_id], score })
            .collect()
    }
}

fn weight_tf(raw: u32, sublinear: bool) -> f32 {
    if sublinear && raw > 0 {
        1.0 + (raw as f32).ln()
    } else {
        raw as f32
    }
}
