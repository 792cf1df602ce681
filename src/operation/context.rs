//! Staging context
//!
//! The identities and key resolver an operation family needs while staging.
//! Built once per dispatch from the session snapshot and the injected
//! services; never shared between dispatches.

use std::fmt;

use super::keys::KeyResolver;
use crate::observability::TraceContext;
use crate::types::EntityId;

/// Context handed to [`crate::tools::OperationTool::stage`]
pub struct StageContext {
    /// The operating identity (pays by default)
    pub operator_id: EntityId,

    /// The user the operating identity acts for, if configured
    pub acting_on_behalf_of: Option<EntityId>,

    /// Resolver for key-bearing parameters
    pub resolver: KeyResolver,

    pub trace_context: Option<TraceContext>,
}

impl fmt::Debug for StageContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StageContext")
            .field("operator_id", &self.operator_id)
            .field("acting_on_behalf_of", &self.acting_on_behalf_of)
            .field("has_signer", &self.resolver.has_signer())
            .field(
                "trace_context",
                &self
                    .trace_context
                    .as_ref()
                    .map(|ctx| format!("trace_id={}, span_id={}", ctx.trace_id, ctx.span_id)),
            )
            .finish()
    }
}

impl StageContext {
    pub fn new(operator_id: EntityId, resolver: KeyResolver) -> Self {
        Self {
            operator_id,
            acting_on_behalf_of: None,
            resolver,
            trace_context: None,
        }
    }

    pub fn acting_on_behalf_of(mut self, account: Option<EntityId>) -> Self {
        self.acting_on_behalf_of = account;
        self
    }

    pub fn with_trace(mut self, trace_context: TraceContext) -> Self {
        self.trace_context = Some(trace_context);
        self
    }

    /// Account an operation is about when the caller names none
    ///
    /// The acting-on-behalf-of user if configured, else the operating identity.
    pub fn default_account(&self) -> EntityId {
        self.acting_on_behalf_of.unwrap_or(self.operator_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_account_prefers_acting_identity() {
        let ctx = StageContext::new(EntityId::from_num(2), KeyResolver::default());
        assert_eq!(ctx.default_account(), EntityId::from_num(2));

        let ctx = ctx.acting_on_behalf_of(Some(EntityId::from_num(1001)));
        assert_eq!(ctx.default_account(), EntityId::from_num(1001));
    }

    #[test]
    fn test_debug_hides_resolver() {
        let ctx = StageContext::new(EntityId::from_num(2), KeyResolver::default())
            .with_trace(TraceContext::new("dispatch"));
        let rendered = format!("{:?}", ctx);
        assert!(rendered.contains("has_signer: false"));
        assert!(rendered.contains("trace_id="));
    }
}
