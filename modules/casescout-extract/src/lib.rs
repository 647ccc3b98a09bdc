//! Pure, synchronous case extraction: text normalization, pattern rule
//! tables, format-specific and generic extractors, candidate validation,
//! and the keyword categorizer. No I/O; malformed input yields empty
//! results, never errors.

pub mod candidate;
pub mod categorize;
pub mod formats;
pub mod generic;
pub mod patterns;
pub mod text;

pub use candidate::{candidate_confidence, is_valid_prompt, refined_confidence, CandidateCase};
pub use categorize::categorize;
pub use formats::{detect_format, extract_structured, DocFormat};
pub use generic::extract_generic;
pub use text::{clean_title, is_truncated_pair, normalize_prompt, normalize_text};
