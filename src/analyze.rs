//! Word-statistics demo driving every structure type.
//!
//! Tokenizes a text, filters it, and feeds each word to a Bloom filter, a
//! HyperLogLog, a Top-K tracker and a Count-Min sketch, keeping an exact set
//! alongside so the HyperLogLog estimate can be compared with the truth.

use std::fmt::{self, Display, Formatter};

use hashbrown::HashSet;
use tracing::debug;

use sketch_store_lib::data_structures::bloom::{BloomFilterConfig, BloomInfo};
use sketch_store_lib::data_structures::TopKEntry;
use sketch_store_lib::error::StoreResult;
use sketch_store_lib::store::{CreatePolicy, SketchStore};

/// Words dropped unless `--all-words` is given.
pub const STOP_WORDS: [&str; 33] = [
    "is", "the", "an", "and", "are", "as", "at", "be", "but", "by", "for", "if", "in", "into",
    "it", "no", "not", "of", "on", "or", "such", "that", "their", "then", "there", "these",
    "they", "this", "to", "was", "will", "with", "queer",
];

/// Words of this many characters or fewer are dropped.
const MIN_WORD_CHARS: usize = 4;

/// Items the Bloom filter's first layer is sized for.
const BLOOM_CAPACITY: u64 = 20_000;

const BLOOM_KEY: &str = "words:bloom";
const HLL_KEY: &str = "words:hyperloglog";
const TOPK_KEY: &str = "words:topk";
const CMS_KEY: &str = "words:cms";

/// Options of one analysis run.
#[derive(Debug, Clone, Copy)]
pub struct AnalyzeOptions {
    /// Number of top words to report
    pub top: usize,
    /// Keep short words and stop words
    pub all_words: bool,
}

/// Results of one analysis run.
#[derive(Debug, Clone)]
pub struct AnalysisReport {
    /// Words fed to the structures
    pub words: u64,
    /// Exact number of distinct words
    pub exact_distinct: usize,
    /// Approximate bytes of the exact set
    pub exact_set_bytes: usize,
    /// HyperLogLog distinct estimate
    pub estimated_distinct: u64,
    /// Bytes owned by the HyperLogLog
    pub hyperloglog_bytes: usize,
    /// Bytes owned by the Bloom filter
    pub bloom_bytes: usize,
    /// Bytes owned by the Top-K tracker
    pub top_k_bytes: usize,
    /// Bytes owned by the Count-Min sketch
    pub count_min_bytes: usize,
    /// Bloom filter shape after the run
    pub bloom: BloomInfo,
    /// Most frequent words, with the Count-Min estimate of each
    pub top: Vec<(TopKEntry, u64)>,
}

/// Lowercase `raw` and decide whether it takes part in the analysis.
pub fn normalize(raw: &str, all_words: bool) -> Option<String> {
    let word = raw.to_lowercase();
    if all_words {
        return Some(word);
    }
    let keep = word.chars().count() > MIN_WORD_CHARS && !STOP_WORDS.contains(&word.as_str());
    keep.then_some(word)
}

/// Run the analysis over `text`, replacing any structures left by an earlier run.
pub fn analyze_text(store: &SketchStore, text: &str, options: AnalyzeOptions) -> StoreResult<AnalysisReport> {
    let defaults = store.defaults();
    let bloom = BloomFilterConfig::new()
        .with_error_rate(defaults.bloom.error_rate)
        .with_capacity(BLOOM_CAPACITY)
        .with_expansion(defaults.bloom.expansion);
    let replace = Some(CreatePolicy::Replace);

    store.bf_reserve(BLOOM_KEY, bloom, replace)?;
    store.pf_create(HLL_KEY, None, replace)?;
    store.topk_reserve(
        TOPK_KEY,
        options.top,
        Some((defaults.top_k.width, defaults.top_k.depth, defaults.top_k.decay)),
        replace,
    )?;
    store.cms_init_by_prob(
        CMS_KEY,
        defaults.count_min.error_rate,
        defaults.count_min.probability,
        replace,
    )?;

    let mut distinct: HashSet<String> = HashSet::new();
    let mut words = 0u64;
    for word in text
        .split_whitespace()
        .filter_map(|raw| normalize(raw, options.all_words))
    {
        store.bf_add(BLOOM_KEY, word.as_bytes())?;
        store.pf_add(HLL_KEY, [&word])?;
        store.topk_add(TOPK_KEY, [&word])?;
        store.cms_incr_by(CMS_KEY, [(&word, 1)])?;
        distinct.insert(word);
        words += 1;
    }
    debug!(words, distinct = distinct.len(), "Analysis input consumed");

    let exact_set_bytes = distinct.capacity() * std::mem::size_of::<String>()
        + distinct.iter().map(String::capacity).sum::<usize>();

    let top = store
        .topk_list(TOPK_KEY)?
        .into_iter()
        .map(|entry| {
            let frequency = store.cms_query(CMS_KEY, [&entry.item])?[0];
            Ok((entry, frequency))
        })
        .collect::<StoreResult<Vec<_>>>()?;

    Ok(AnalysisReport {
        words,
        exact_distinct: distinct.len(),
        exact_set_bytes,
        estimated_distinct: store.pf_count([HLL_KEY])?,
        hyperloglog_bytes: store.memory_usage(HLL_KEY)?,
        bloom_bytes: store.memory_usage(BLOOM_KEY)?,
        top_k_bytes: store.memory_usage(TOPK_KEY)?,
        count_min_bytes: store.memory_usage(CMS_KEY)?,
        bloom: store.bf_info(BLOOM_KEY)?,
        top,
    })
}

fn kib(bytes: usize) -> f64 {
    bytes as f64 / 1024.0
}

impl Display for AnalysisReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "Processed {} words.", self.words)?;
        writeln!(
            f,
            "There are {} distinct words in the exact set ({:.1}kb).",
            self.exact_distinct,
            kib(self.exact_set_bytes)
        )?;
        writeln!(
            f,
            "The HyperLogLog counted {} distinct words ({:.1}kb).",
            self.estimated_distinct,
            kib(self.hyperloglog_bytes)
        )?;
        writeln!(
            f,
            "The Bloom filter uses {:.1}kb across {} sub-filters.",
            kib(self.bloom_bytes),
            self.bloom.number_of_filters
        )?;
        writeln!(f, "The Top-K tracker uses {:.1}kb.", kib(self.top_k_bytes))?;
        writeln!(f, "The Count-Min sketch uses {:.1}kb.", kib(self.count_min_bytes))?;
        writeln!(f, "The top {} words are:", self.top.len())?;
        for (entry, frequency) in &self.top {
            writeln!(
                f,
                "  {:<20} {:>8} (count-min {})",
                String::from_utf8_lossy(&entry.item),
                entry.count,
                frequency
            )?;
        }
        Ok(())
    }
}
