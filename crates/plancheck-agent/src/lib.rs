//! Plancheck Agent: LLM collaborators, pipeline and batch runner around the kernel.
//!
//! - `llm_client`: OpenAI-compatible chat completions over reqwest
//! - `planner` / `extractor`: the generator and extractor the kernel consumes
//! - `pipeline`: extract -> generate -> validate -> optional repair
//! - `batch` / `results`: scenario runs with per-mode summaries

pub mod batch;
pub mod extractor;
pub mod llm_client;
pub mod pipeline;
pub mod planner;
pub mod results;
