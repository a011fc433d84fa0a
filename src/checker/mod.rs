// src/checker/mod.rs
// =============================================================================
// This module contains all URL checking logic.
//
// Submodules:
// - http: Probes URLs (HEAD/GET, redirects, retries, concurrency)
// - errors: Maps transport failures to user-facing labels
// - soft404: Spots "200 OK" pages that are really error pages
// - result: The per-URL record we produce
// - settings: Knobs for one checking run
//
// Rust concepts:
// - Modules: Organize code into namespaces
// - pub use: Re-export items to simplify imports for users of this module
// =============================================================================

mod errors;
mod http;
mod result;
mod settings;
mod soft404;

pub use http::{check_all, ProgressCallback};
pub use result::CheckResult;
pub use settings::CheckSettings;
