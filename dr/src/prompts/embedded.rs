//! Embedded prompts
//!
//! These are compiled into the binary from .pmt files at build time.

use tracing::debug;

/// Topic decomposition prompt
pub const PLAN: &str = include_str!("../../prompts/plan.pmt");

/// Refinement follow-up prompt
pub const FOLLOWUP: &str = include_str!("../../prompts/followup.pmt");

/// Single-call article summary prompt
pub const SUMMARIZE_ARTICLE: &str = include_str!("../../prompts/summarize-article.pmt");

/// Per-chunk summary prompt
pub const SUMMARIZE_CHUNK: &str = include_str!("../../prompts/summarize-chunk.pmt");

/// Chunk summary combination prompt
pub const COMBINE_CHUNKS: &str = include_str!("../../prompts/combine-chunks.pmt");

/// Report synthesis prompt
pub const SYNTHESIZE: &str = include_str!("../../prompts/synthesize.pmt");

/// Get the embedded prompt by name
pub fn get_embedded(name: &str) -> Option<&'static str> {
    debug!(%name, "get_embedded: called");
    let found = match name {
        "plan" => Some(PLAN),
        "followup" => Some(FOLLOWUP),
        "summarize-article" => Some(SUMMARIZE_ARTICLE),
        "summarize-chunk" => Some(SUMMARIZE_CHUNK),
        "combine-chunks" => Some(COMBINE_CHUNKS),
        "synthesize" => Some(SYNTHESIZE),
        _ => None,
    };
    if found.is_none() {
        debug!("get_embedded: no match found");
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_embedded_plan() {
        let plan = get_embedded("plan").unwrap();
        assert!(plan.contains("3–5 focused sub-questions"));
        assert!(plan.contains("{{topic}}"));
        assert!(plan.contains("numbered list"));
    }

    #[test]
    fn test_get_embedded_synthesize_sections() {
        let synth = get_embedded("synthesize").unwrap();
        for section in ["Introduction", "Key Findings", "Contrasting Perspectives", "Conclusion"] {
            assert!(synth.contains(section), "missing {}", section);
        }
    }

    #[test]
    fn test_get_embedded_all_names() {
        for name in [
            "plan",
            "followup",
            "summarize-article",
            "summarize-chunk",
            "combine-chunks",
            "synthesize",
        ] {
            assert!(get_embedded(name).is_some(), "missing {}", name);
        }
    }

    #[test]
    fn test_get_embedded_unknown() {
        assert!(get_embedded("unknown-template").is_none());
    }
}
