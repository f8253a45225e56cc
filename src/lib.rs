//! Client-side conversation/session runtime for an embeddable chat widget.
//!
//! The runtime reconciles a visitor's identity and conversation state
//! across page loads, merges the history fetch and three realtime streams
//! into one consistent timeline, detects the page's location context
//! through a prioritized strategy chain, and strips duplicate content when
//! richer UI affordances supersede it. Rendering, authentication, and the
//! hosted backend itself live elsewhere and are reached only through the
//! trait seams in [`runtime::WidgetBackends`].

// Interdiction stricte de pratiques dangereuses ou non idiomatiques
#![deny(warnings)] // Tous les warnings sont traités comme des erreurs
#![deny(unsafe_code)] // Le code unsafe est interdit
#![deny(missing_docs)] // Toute fonction, struct, enum ou module public doit être documenté
#![deny(unused_imports)] // Les imports inutilisés sont interdits
#![deny(unused_variables)] // Les variables inutilisés sont interdits
#![deny(unused_must_use)] // Oblige à gérer explicitement les Result et Option
#![deny(non_snake_case)] // Les noms de variables et fonctions doivent être en snake_case
#![deny(nonstandard_style)] // Empêche tout style de code non standard
#![forbid(unsafe_op_in_unsafe_fn)]

// Clippy pour stricte discipline
#![deny(clippy::all)]
#![deny(clippy::unwrap_used)] // Interdit unwrap() hors tests
#![deny(clippy::expect_used)] // Interdit expect() hors tests
#![deny(clippy::print_stdout)] // Interdit println!() en production

/// Pure text transforms: sanitation and traffic attribution.
pub mod content;
/// Conversation state: timeline, list, backend contract, side effects.
pub mod conversation;
/// Shared vocabulary: ids, errors, configuration.
pub mod core;
/// Location detection strategy chain.
pub mod location;
/// Realtime stream adapters and transport.
pub mod realtime;
/// Orchestrating facade tying every subsystem to one conversation id.
pub mod runtime;
/// Visitor identity and per-conversation flags.
pub mod session;
/// Durable client-side key-value storage.
pub mod storage;

pub use crate::core::{AgentKey, ConversationId, WidgetConfig, WidgetError, WidgetResult};
pub use crate::runtime::{WidgetBackends, WidgetRuntime};
