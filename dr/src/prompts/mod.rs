//! Prompt Template System
//!
//! Loads and renders `.pmt` (prompt template) files for every model call the
//! research loop makes.
//!
//! Template loading chain:
//! 1. `.deepresearch/prompts/{name}.pmt` (user override)
//! 2. `prompts/{name}.pmt` (project default)
//! 3. Embedded fallback in code
//!
//! Templates use Handlebars syntax for variable substitution, with HTML
//! escaping disabled.

pub mod embedded;
mod loader;

pub use loader::PromptLoader;
