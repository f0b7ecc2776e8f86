//! Multi-signal scoring engine
//!
//! Combines three independent signals into a per-subject score:
//! filename keyword hits (+1 each), origin-device label (+3), and the
//! statistical model's prediction (+2, gated on enough extracted text).
//! The decision is the unique maximum; ties and all-zero scores are an
//! explicit unclassifiable outcome, never silently resolved.

use crate::device::VolumeLabeler;
use crate::extract::ContentExtractor;
use crate::model::SubjectModel;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Weight of a single filename keyword hit.
pub const FILENAME_WEIGHT: u32 = 1;
/// Weight of the origin-device label signal, the strongest single signal.
pub const DEVICE_WEIGHT: u32 = 3;
/// Weight of the model's content prediction.
pub const CONTENT_WEIGHT: u32 = 2;
/// Minimum normalized character count before the content signal applies.
pub const MIN_CONTENT_CHARS: usize = 30;

/// Which evidence source produced a contribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Filename,
    Device,
    Content,
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Signal::Filename => write!(f, "filename"),
            Signal::Device => write!(f, "device"),
            Signal::Content => write!(f, "content"),
        }
    }
}

/// One scored contribution, kept for the audit trail.
#[derive(Debug, Clone)]
pub struct Evidence {
    pub signal: Signal,
    pub subject: String,
    pub weight: u32,
    /// Matched keyword, volume label, or model output.
    pub detail: String,
}

impl fmt::Display for Evidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{:+} {} ({})",
            self.signal, self.weight, self.subject, self.detail
        )
    }
}

/// The outcome of scoring one file. `subject = None` means
/// unclassifiable (no positive score, or an unresolvable tie).
#[derive(Debug, Clone)]
pub struct Decision {
    pub path: PathBuf,
    pub subject: Option<String>,
    pub evidence: Vec<Evidence>,
}

/// Scoring strategy selected at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoringMode {
    /// Compute every signal, then take the unique maximum.
    Weighted,
    /// If filename keywords alone produce a unique winner, skip content
    /// extraction and the model entirely. Extraction can be slow or fail
    /// on half-supported formats, so this is the default.
    FilenameFirst,
}

pub struct Classifier {
    keywords: BTreeMap<String, Vec<String>>,
    device_labels: BTreeMap<String, String>,
    mode: ScoringMode,
    extractor: Arc<dyn ContentExtractor>,
    model: Arc<dyn SubjectModel>,
    labeler: Arc<dyn VolumeLabeler>,
}

impl Classifier {
    pub fn new(
        keywords: BTreeMap<String, Vec<String>>,
        device_labels: BTreeMap<String, String>,
        mode: ScoringMode,
        extractor: Arc<dyn ContentExtractor>,
        model: Arc<dyn SubjectModel>,
        labeler: Arc<dyn VolumeLabeler>,
    ) -> Self {
        Self {
            keywords,
            device_labels,
            mode,
            extractor,
            model,
            labeler,
        }
    }

    /// Score a file and decide its subject.
    pub fn classify(&self, path: &Path) -> Decision {
        let mut evidence = self.filename_evidence(path);

        if self.mode == ScoringMode::FilenameFirst {
            if let Some(subject) = unique_winner(&evidence) {
                debug!(path = %path.display(), subject, "filename signal alone is decisive");
                return Decision {
                    path: path.to_path_buf(),
                    subject: Some(subject),
                    evidence,
                };
            }
        }

        evidence.extend(self.device_evidence(path));
        evidence.extend(self.content_evidence(path));

        let subject = unique_winner(&evidence);
        Decision {
            path: path.to_path_buf(),
            subject,
            evidence,
        }
    }

    /// Case-insensitive substring match of the cleaned base filename
    /// against each subject's keyword list. Every hit counts, so a name
    /// matching two keywords of one subject compounds its score.
    fn filename_evidence(&self, path: &Path) -> Vec<Evidence> {
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let haystack = normalize_ws(&stem).to_lowercase();

        let mut evidence = Vec::new();
        for (subject, keywords) in &self.keywords {
            for keyword in keywords {
                if haystack.contains(&keyword.to_lowercase()) {
                    evidence.push(Evidence {
                        signal: Signal::Filename,
                        subject: subject.clone(),
                        weight: FILENAME_WEIGHT,
                        detail: keyword.clone(),
                    });
                }
            }
        }
        evidence
    }

    fn device_evidence(&self, path: &Path) -> Option<Evidence> {
        let label = self.labeler.label_for(path)?;
        let subject = self.device_labels.get(&label)?;
        Some(Evidence {
            signal: Signal::Device,
            subject: subject.clone(),
            weight: DEVICE_WEIGHT,
            detail: label,
        })
    }

    /// Extraction failures degrade to "no content signal"; the other
    /// signals still apply.
    fn content_evidence(&self, path: &Path) -> Option<Evidence> {
        let text = match self.extractor.extract(path) {
            Ok(text) => text,
            Err(err) => {
                debug!(path = %path.display(), error = %err, "content extraction unavailable");
                return None;
            }
        };

        let normalized = normalize_ws(&text);
        if normalized.chars().count() < MIN_CONTENT_CHARS {
            debug!(path = %path.display(), chars = normalized.chars().count(), "content below gate");
            return None;
        }

        let subject = self.model.predict(&normalized)?;
        Some(Evidence {
            signal: Signal::Content,
            subject: subject.clone(),
            weight: CONTENT_WEIGHT,
            detail: format!("model:{subject}"),
        })
    }
}

/// Sum contributions per subject and return the subject holding a unique
/// positive maximum, or `None` on a tie or an empty board.
fn unique_winner(evidence: &[Evidence]) -> Option<String> {
    let mut scores: BTreeMap<&str, u32> = BTreeMap::new();
    for item in evidence {
        *scores.entry(item.subject.as_str()).or_insert(0) += item.weight;
    }

    let max = scores.values().copied().max().filter(|m| *m > 0)?;
    let mut at_max = scores.iter().filter(|(_, score)| **score == max);
    let (winner, _) = at_max.next()?;
    if at_max.next().is_some() {
        return None;
    }
    Some(winner.to_string())
}

/// Collapse runs of whitespace and trim, matching how both filenames and
/// extracted content are cleaned before matching or gating.
pub fn normalize_ws(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::StaticLabels;
    use crate::error::{Result, ShelverError};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StubExtractor {
        text: Option<String>,
        calls: AtomicUsize,
    }

    impl StubExtractor {
        fn with_text(text: &str) -> Self {
            Self {
                text: Some(text.to_string()),
                calls: AtomicUsize::new(0),
            }
        }

        fn failing() -> Self {
            Self {
                text: None,
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl ContentExtractor for StubExtractor {
        fn extract(&self, path: &Path) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.text.clone().ok_or_else(|| ShelverError::Extraction {
                path: path.to_path_buf(),
                reason: "stub failure".to_string(),
            })
        }
    }

    struct StubModel(Option<String>);

    impl SubjectModel for StubModel {
        fn predict(&self, _text: &str) -> Option<String> {
            self.0.clone()
        }
    }

    fn keywords() -> BTreeMap<String, Vec<String>> {
        let mut table = BTreeMap::new();
        table.insert(
            "语文".to_string(),
            vec!["语文".to_string(), "作文".to_string()],
        );
        table.insert(
            "数学".to_string(),
            vec!["数学".to_string(), "函数".to_string()],
        );
        table.insert("英语".to_string(), vec!["reading".to_string()]);
        table
    }

    fn classifier(
        mode: ScoringMode,
        extractor: Arc<StubExtractor>,
        model: StubModel,
        device_labels: BTreeMap<String, String>,
        labeler: StaticLabels,
    ) -> Classifier {
        Classifier::new(
            keywords(),
            device_labels,
            mode,
            extractor,
            Arc::new(model),
            Arc::new(labeler),
        )
    }

    fn plain(mode: ScoringMode, extractor: Arc<StubExtractor>, model: StubModel) -> Classifier {
        classifier(
            mode,
            extractor,
            model,
            BTreeMap::new(),
            StaticLabels::default(),
        )
    }

    #[test]
    fn test_unique_max_wins() {
        let extractor = Arc::new(StubExtractor::failing());
        let c = plain(ScoringMode::Weighted, extractor, StubModel(None));

        // Two keyword hits for 数学, none for anyone else.
        let decision = c.classify(Path::new("/inbox/数学函数专题.docx"));
        assert_eq!(decision.subject.as_deref(), Some("数学"));
        assert_eq!(decision.evidence.len(), 2);
    }

    #[test]
    fn test_tie_is_unclassifiable() {
        let extractor = Arc::new(StubExtractor::failing());
        let c = plain(ScoringMode::Weighted, extractor, StubModel(None));

        // One hit each for 语文 and 数学.
        let decision = c.classify(Path::new("/inbox/语文数学合卷.docx"));
        assert_eq!(decision.subject, None);
        assert_eq!(decision.evidence.len(), 2);
    }

    #[test]
    fn test_no_signal_is_unclassifiable() {
        let extractor = Arc::new(StubExtractor::failing());
        let c = plain(ScoringMode::Weighted, extractor, StubModel(None));

        let decision = c.classify(Path::new("/inbox/assorted-notes.docx"));
        assert_eq!(decision.subject, None);
        assert!(decision.evidence.is_empty());
    }

    #[test]
    fn test_device_label_override() {
        let mut device_labels = BTreeMap::new();
        device_labels.insert("黄".to_string(), "语文".to_string());
        let mut prefixes = BTreeMap::new();
        prefixes.insert(PathBuf::from("/media/alex/黄"), "黄".to_string());

        let extractor = Arc::new(StubExtractor::failing());
        let c = classifier(
            ScoringMode::Weighted,
            extractor,
            StubModel(None),
            device_labels,
            StaticLabels::new(prefixes),
        );

        // No filename keyword hit; the device signal alone decides.
        let decision = c.classify(Path::new("/media/alex/黄/untitled.docx"));
        assert_eq!(decision.subject.as_deref(), Some("语文"));
        assert_eq!(decision.evidence[0].signal, Signal::Device);
        assert_eq!(decision.evidence[0].weight, DEVICE_WEIGHT);
    }

    #[test]
    fn test_device_outweighs_single_keyword() {
        let mut device_labels = BTreeMap::new();
        device_labels.insert("黄".to_string(), "语文".to_string());
        let mut prefixes = BTreeMap::new();
        prefixes.insert(PathBuf::from("/media/alex/黄"), "黄".to_string());

        let extractor = Arc::new(StubExtractor::failing());
        let c = classifier(
            ScoringMode::Weighted,
            extractor,
            StubModel(None),
            device_labels,
            StaticLabels::new(prefixes),
        );

        // 数学 gets +1 from the filename, 语文 gets +3 from the device.
        let decision = c.classify(Path::new("/media/alex/黄/数学风格随笔.docx"));
        assert_eq!(decision.subject.as_deref(), Some("语文"));
    }

    #[test]
    fn test_short_content_never_contributes() {
        let extractor = Arc::new(StubExtractor::with_text("too short"));
        let c = plain(
            ScoringMode::Weighted,
            extractor,
            StubModel(Some("英语".to_string())),
        );

        let decision = c.classify(Path::new("/inbox/untitled.docx"));
        assert_eq!(decision.subject, None);
        assert!(decision.evidence.is_empty());
    }

    #[test]
    fn test_content_signal_applies_above_gate() {
        let long_text = "reading ".repeat(10);
        let extractor = Arc::new(StubExtractor::with_text(&long_text));
        let c = plain(
            ScoringMode::Weighted,
            extractor,
            StubModel(Some("英语".to_string())),
        );

        let decision = c.classify(Path::new("/inbox/untitled.docx"));
        assert_eq!(decision.subject.as_deref(), Some("英语"));
        assert_eq!(decision.evidence[0].weight, CONTENT_WEIGHT);
    }

    #[test]
    fn test_filename_first_skips_extraction() {
        let extractor = Arc::new(StubExtractor::with_text(&"函数 ".repeat(20)));
        let c = plain(
            ScoringMode::FilenameFirst,
            Arc::clone(&extractor),
            StubModel(Some("英语".to_string())),
        );

        let decision = c.classify(Path::new("/inbox/作文指导.docx"));
        assert_eq!(decision.subject.as_deref(), Some("语文"));
        assert_eq!(extractor.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_filename_first_falls_through_on_tie() {
        let long_text = "reading ".repeat(10);
        let extractor = Arc::new(StubExtractor::with_text(&long_text));
        let c = plain(
            ScoringMode::FilenameFirst,
            Arc::clone(&extractor),
            StubModel(Some("英语".to_string())),
        );

        // Filename ties 语文/数学, so extraction runs and the content
        // signal breaks the deadlock.
        let decision = c.classify(Path::new("/inbox/语文数学杂记.docx"));
        assert_eq!(decision.subject.as_deref(), Some("英语"));
        assert_eq!(extractor.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_normalize_ws() {
        assert_eq!(normalize_ws("  a\t\tb \n c  "), "a b c");
        assert_eq!(normalize_ws(""), "");
    }
}
