//! # SkillWise backend
//!
//! The HTTP backend for the SkillWise learning app: document Q&A, quiz
//! generation, and mentor chat, all proxied through a single completion
//! gateway and guarded by bearer-token authentication.
//!
//! ## Pipeline
//!
//! ```text
//! ┌────────┐   ┌───────────┐   ┌────────────┐   ┌───────────┐
//! │ Upload │──▶│ Extractor │──▶│  Document   │   │ Completion │
//! │ (HTTP) │   │ PDF/DOCX  │   │  Store      │──▶│  Gateway   │
//! └────────┘   │ /TXT      │   │ (per owner) │   │ (HTTP out) │
//!              └───────────┘   └──────▲──────┘   └─────▲─────┘
//!                                     │                │
//!                               ask: stored text ──▶ prompt
//! ```
//!
//! A client uploads a file; the extractor turns it into plain text and the
//! store keeps it keyed by the verified owner. Later questions compose a
//! budget-truncated prompt from that text and go out through the gateway.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`error`] | Typed error taxonomy |
//! | [`extract`] | PDF/DOCX/plain-text extraction |
//! | [`store`] | Per-user document store |
//! | [`prompt`] | Prompt composition and truncation budgets |
//! | [`completion`] | Completion-service client |
//! | [`auth`] | Bearer-token verification |
//! | [`server`] | Axum router and request handlers |

pub mod auth;
pub mod completion;
pub mod config;
pub mod error;
pub mod extract;
pub mod prompt;
pub mod server;
pub mod store;
