//! Providers of the objects advice bodies run on.

use std::fmt;
use std::sync::{Arc, OnceLock};

use crate::{
    model::{Instance, LoaderId},
    Result,
};

/// Supplies the aspect object an advice body is invoked on
///
/// The interception engine never creates aspects itself. Whoever owns the aspect (usually a
/// dependency injection container) hands it over through this trait.
pub trait AspectInstanceFactory: Send + Sync {
    /// The aspect object
    ///
    /// # Errors
    /// Propagates failures to create the aspect.
    fn instance(&self) -> Result<Arc<Instance>>;

    /// Precedence of the aspect, lower values run first
    fn order(&self) -> i32 {
        i32::MAX
    }

    /// The loader the aspect's pointcuts resolve type names from
    fn code_loading_context(&self) -> LoaderId {
        LoaderId::BOOTSTRAP
    }
}

/// Hands out one existing aspect object
#[derive(Debug, Clone)]
pub struct SingletonAspectInstanceFactory {
    instance: Arc<Instance>,
    order: i32,
    loader: LoaderId,
}

impl SingletonAspectInstanceFactory {
    /// Wrap `instance` with the lowest precedence
    #[must_use]
    pub fn new(instance: Arc<Instance>) -> Self {
        SingletonAspectInstanceFactory {
            instance,
            order: i32::MAX,
            loader: LoaderId::BOOTSTRAP,
        }
    }

    /// Set the precedence
    #[must_use]
    pub fn with_order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }

    /// Set the code loading context
    #[must_use]
    pub fn with_loader(mut self, loader: LoaderId) -> Self {
        self.loader = loader;
        self
    }
}

impl AspectInstanceFactory for SingletonAspectInstanceFactory {
    fn instance(&self) -> Result<Arc<Instance>> {
        Ok(self.instance.clone())
    }

    fn order(&self) -> i32 {
        self.order
    }

    fn code_loading_context(&self) -> LoaderId {
        self.loader
    }
}

/// Builds the aspect object on first use
type AspectSupplier = Box<dyn Fn() -> Result<Arc<Instance>> + Send + Sync>;

/// Creates the aspect object once, the first time advice needs it
///
/// A failed creation is not remembered; the next call tries again.
pub struct LazySingletonAspectInstanceFactory {
    supplier: AspectSupplier,
    instance: OnceLock<Arc<Instance>>,
    order: i32,
    loader: LoaderId,
}

impl LazySingletonAspectInstanceFactory {
    /// Create the aspect through `supplier` on first use
    pub fn new(supplier: impl Fn() -> Result<Arc<Instance>> + Send + Sync + 'static) -> Self {
        LazySingletonAspectInstanceFactory {
            supplier: Box::new(supplier),
            instance: OnceLock::new(),
            order: i32::MAX,
            loader: LoaderId::BOOTSTRAP,
        }
    }

    /// Set the precedence
    #[must_use]
    pub fn with_order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }

    /// Set the code loading context
    #[must_use]
    pub fn with_loader(mut self, loader: LoaderId) -> Self {
        self.loader = loader;
        self
    }

    /// Returns true once the aspect was created
    #[must_use]
    pub fn is_materialized(&self) -> bool {
        self.instance.get().is_some()
    }
}

impl AspectInstanceFactory for LazySingletonAspectInstanceFactory {
    fn instance(&self) -> Result<Arc<Instance>> {
        if let Some(instance) = self.instance.get() {
            return Ok(instance.clone());
        }
        let created = (self.supplier)()?;
        Ok(self.instance.get_or_init(|| created).clone())
    }

    fn order(&self) -> i32 {
        self.order
    }

    fn code_loading_context(&self) -> LoaderId {
        self.loader
    }
}

impl fmt::Debug for LazySingletonAspectInstanceFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazySingletonAspectInstanceFactory")
            .field("materialized", &self.is_materialized())
            .field("order", &self.order)
            .field("loader", &self.loader)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Builtin;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_singleton() -> Result<()> {
        let aspect = Arc::new(Instance::new(Builtin::Object.token()));
        let factory = SingletonAspectInstanceFactory::new(aspect.clone()).with_order(3);
        assert!(Arc::ptr_eq(&factory.instance()?, &aspect));
        assert_eq!(factory.order(), 3);
        assert_eq!(factory.code_loading_context(), LoaderId::BOOTSTRAP);
        Ok(())
    }

    #[test]
    fn test_lazy_singleton_creates_once() -> Result<()> {
        let created = Arc::new(AtomicUsize::new(0));
        let counter = created.clone();
        let factory = LazySingletonAspectInstanceFactory::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(Instance::new(Builtin::Object.token())))
        });

        assert!(!factory.is_materialized());
        let first = factory.instance()?;
        let second = factory.instance()?;
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(created.load(Ordering::SeqCst), 1);
        assert_eq!(factory.order(), i32::MAX);
        Ok(())
    }
}
