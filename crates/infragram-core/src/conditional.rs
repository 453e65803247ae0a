//! Conditional presence of resources.

use std::fmt;

/// Presence classification of a resource for one run.
///
/// Computed once by the conditional resolver and never re-evaluated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ConditionalState {
    /// The resource has no count-like attribute, or it evaluates to non-zero.
    #[default]
    Always,
    /// The count-like attribute evaluates to zero.
    Never,
    /// The count-like attribute depends on values that cannot be resolved
    /// statically. The resource is kept and styled as conditional.
    Dynamic,
}

impl ConditionalState {
    pub fn is_dynamic(&self) -> bool {
        matches!(self, ConditionalState::Dynamic)
    }

    pub fn is_never(&self) -> bool {
        matches!(self, ConditionalState::Never)
    }
}

impl From<ConditionalState> for &'static str {
    fn from(val: ConditionalState) -> Self {
        match val {
            ConditionalState::Always => "always",
            ConditionalState::Never => "never",
            ConditionalState::Dynamic => "dynamic",
        }
    }
}

impl fmt::Display for ConditionalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s: &'static str = (*self).into();
        write!(f, "{s}")
    }
}

/// A classification together with the condition that produced it.
///
/// `condition` is the human readable form of the controlling expression
/// (the test of a ternary, or the whole count expression), kept only for
/// [`ConditionalState::Dynamic`] so it can be shown as a `(When ...)`
/// annotation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Presence {
    state: ConditionalState,
    condition: Option<String>,
}

impl Presence {
    pub fn always() -> Self {
        Self::default()
    }

    pub fn never() -> Self {
        Self {
            state: ConditionalState::Never,
            condition: None,
        }
    }

    pub fn dynamic(condition: impl Into<String>) -> Self {
        Self {
            state: ConditionalState::Dynamic,
            condition: Some(condition.into()),
        }
    }

    pub fn state(&self) -> ConditionalState {
        self.state
    }

    pub fn condition(&self) -> Option<&str> {
        self.condition.as_deref()
    }
}
