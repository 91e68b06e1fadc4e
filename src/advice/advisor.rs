//! Assembling interceptor chains from advisors.

use std::fmt;
use std::sync::Arc;

use rayon::prelude::*;

use crate::{
    advice::{Advice, Interceptor},
    config::AspectConfig,
    model::{MethodId, TypeToken},
    pointcut::ExpressionPointcut,
    Result,
};

/// An advice together with the precedence of its aspect
pub struct Advisor {
    advice: Advice,
    order: i32,
}

impl Advisor {
    /// Wrap `advice`, taking the order from its aspect instance provider
    #[must_use]
    pub fn new(advice: Advice) -> Self {
        let order = advice.core().instance_factory().order();
        Advisor { advice, order }
    }

    /// The advice
    #[must_use]
    pub fn advice(&self) -> &Advice {
        &self.advice
    }

    /// Aspect precedence, lower runs first
    #[must_use]
    pub fn order(&self) -> i32 {
        self.order
    }

    /// The advice's pointcut
    #[must_use]
    pub fn pointcut(&self) -> &Arc<ExpressionPointcut> {
        self.advice.pointcut()
    }
}

impl fmt::Display for Advisor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (order {})", self.advice, self.order)
    }
}

impl fmt::Debug for Advisor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Advisor({self})")
    }
}

/// Sort advisors into execution order
///
/// Aspect order comes first, then the advice kind (around, before, after, after returning,
/// after throwing), then the position of the advice in its aspect.
pub fn sort_advisors(advisors: &mut [Arc<Advisor>]) {
    advisors.sort_by_key(|advisor| {
        (
            advisor.order(),
            advisor.advice().kind().precedence(),
            advisor.advice().core().declaration_order(),
        )
    });
}

/// Builds the interceptor chain of a method
#[derive(Debug, Clone, Copy, Default)]
pub struct AdvisorChainFactory {
    config: AspectConfig,
}

impl AdvisorChainFactory {
    /// Create a factory
    #[must_use]
    pub fn new(config: AspectConfig) -> Self {
        AdvisorChainFactory { config }
    }

    /// The advisors whose pointcut could match some method of `target_type`
    #[must_use]
    pub fn eligible_advisors(&self, advisors: &[Arc<Advisor>], target_type: TypeToken) -> Vec<Arc<Advisor>> {
        let could_match = |advisor: &&Arc<Advisor>| advisor.pointcut().type_could_match(target_type);
        if self.config.parallel_advisor_filtering {
            advisors.par_iter().filter(could_match).cloned().collect()
        } else {
            advisors.iter().filter(could_match).cloned().collect()
        }
    }

    /// The ordered interceptors for `method` invoked on `target_type`
    ///
    /// Advisors whose pointcut needs call-time values become [`Interceptor::Dynamic`].
    ///
    /// # Errors
    /// Propagates configuration errors of the advisors' pointcuts.
    pub fn interceptors_for(
        &self,
        advisors: &[Arc<Advisor>],
        method: MethodId,
        target_type: TypeToken,
        has_introductions: bool,
    ) -> Result<Arc<[Interceptor]>> {
        let mut eligible = self.eligible_advisors(advisors, target_type);
        sort_advisors(&mut eligible);

        let mut chain = Vec::with_capacity(eligible.len());
        for advisor in eligible {
            let pointcut = advisor.pointcut();
            if !pointcut.method_matches_statically(method, target_type, has_introductions)? {
                continue;
            }
            if pointcut.is_dynamic()? {
                chain.push(Interceptor::Dynamic(advisor));
            } else {
                chain.push(Interceptor::Static(advisor));
            }
        }

        log::debug!(
            "Interceptor chain for {} on {}: {:?}",
            method,
            target_type,
            chain
        );
        Ok(chain.into())
    }
}
