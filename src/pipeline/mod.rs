//! Pipeline stages for turning PDF uploads into report structures.
//!
//! Each submodule implements exactly one step, so each is testable on its
//! own and the PDF engine or the model backend can be swapped without
//! touching the others.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ extract ──▶ clean ──▶ llm ──▶ recover ──▶ (fallback)
//! (path/URL) (pdfium)   (rules)   (model)  (JSON)     (heuristics)
//! ```
//!
//! 1. [`input`]: read a local file or download a URL into an upload
//! 2. [`extract`]: validate PDF bytes and pull per-page text; blocking,
//!    run inside `spawn_blocking`
//! 3. [`clean`]: deterministic normalisation of extracted text
//! 4. [`llm`]: the model call with timeout and retry/backoff; the
//!    only stage with network I/O besides URL downloads
//! 5. [`recover`]: locate and decode the JSON object in model output,
//!    with one escaping repair pass
//! 6. [`fallback`]: heuristic report when nothing can be recovered

pub mod clean;
pub mod extract;
pub mod fallback;
pub mod input;
pub mod llm;
pub mod recover;
