pub mod comments;
pub mod config;
pub mod declarations;
pub mod error;
pub mod fixer;
pub mod guard;
pub mod ignore_rules;
pub mod matcher;
pub mod registry;
pub mod scanner;
pub mod syntax;

pub use config::GuardConfig;
pub use declarations::{DeclarationFormat, Declarations};
pub use error::GuardError;
pub use fixer::{AppliedFix, FixFailure, FixReport, apply_fixes};
pub use guard::Guard;
pub use ignore_rules::IgnoreRules;
pub use matcher::{DEFAULT_THRESHOLD, Issue, Matcher};
pub use registry::{BUILTIN_WHITELIST, Registry, RegistryBuilder, RegistryEntry, RegistrySource};
pub use scanner::{Usage, UsageScanner};
pub use syntax::SyntaxKind;
