//! Core functionality for resolving instances from a
//! [BindingRegistry](crate::binding_registry::BindingRegistry). A [Resolver] carries the state of a
//! single resolution request - the chain of keys under construction - and is passed to every
//! constructor as its [InstanceProvider], so nested dependencies are resolved within the same
//! request. Unrelated concurrent requests use separate resolvers and never share this state.

use crate::binding_registry::{Binding, BindingRegistry};
use crate::error::{CapturedPanic, ResolutionError};
use crate::exceptional::Exceptional;
use crate::injection_point::InjectionPointChain;
use crate::instance_provider::{error_ptr, AnyInstancePtr, ErrorPtr, InstanceProvider};
use crate::key::Key;
use crate::properties::PropertyStore;
use crate::provider::{Arguments, CastFunction, Constructor, ConstructorCandidate, Strategy};
use crate::scope::Scope;
use itertools::Itertools;
use std::any::TypeId;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, trace};

/// Request-local [InstanceProvider] executing binding strategies.
pub struct Resolver<'a> {
    bindings: &'a BindingRegistry,
    injection_points: &'a InjectionPointChain,
    properties: &'a PropertyStore,
    chain: Vec<Key>,
}

/// Strategies which create instances, as opposed to returning or redirecting to existing ones.
#[derive(Clone, Copy)]
enum Construction<'s> {
    Constructor(&'s Constructor),
    Bound(&'s [ConstructorCandidate]),
}

impl<'a> Resolver<'a> {
    pub fn new(
        bindings: &'a BindingRegistry,
        injection_points: &'a InjectionPointChain,
        properties: &'a PropertyStore,
    ) -> Self {
        Self {
            bindings,
            injection_points,
            properties,
            chain: Vec::new(),
        }
    }

    /// Follows aliases starting at `key` and provides the final instance, cast back through all
    /// visited aliases.
    fn follow(&mut self, key: &Key) -> Exceptional<AnyInstancePtr> {
        let mut visited: Vec<Key> = Vec::new();
        let mut aliases: Vec<(Arc<Binding>, CastFunction)> = Vec::new();
        let mut current = key.clone();

        let (scope, target, instance) = loop {
            let Some(binding) = self.bindings.binding(&current) else {
                trace!(key = %current, "Key is not bound.");
                return Exceptional::Absent;
            };

            if visited.contains(&current) {
                let cycle = visited
                    .iter()
                    .chain([&current])
                    .map(|key| key.to_string())
                    .collect_vec();

                debug!(key = %key, "Alias cycle detected.");
                return Exceptional::failed(ResolutionError::AliasCycle(cycle));
            }

            visited.push(current.clone());

            let construction = match binding.provider().strategy() {
                Strategy::Alias { target, cast } => {
                    aliases.push((binding.clone(), cast.clone()));
                    current = target.clone();
                    continue;
                }
                Strategy::Fixed(instance) => {
                    break (Scope::Fixed, current, instance.clone());
                }
                Strategy::Constructor(constructor) => Construction::Constructor(constructor),
                Strategy::BoundConstructor(candidates) => Construction::Bound(candidates),
            };

            match self.provide(&binding, construction) {
                Ok(instance) => break (binding.scope(), current, instance),
                Err(cause) => return Exceptional::Failed(cause),
            }
        };

        let mut applied = vec![target];
        aliases
            .into_iter()
            .rev()
            .try_fold(instance, |instance, (alias, cast)| -> Result<_, ErrorPtr> {
                let instance = self.adapt(scope, &alias, &cast, instance, &applied)?;
                applied.push(alias.key().clone());
                Ok(instance)
            })
            .into()
    }

    /// Casts an instance to the capability of an alias and offers it to injection points
    /// accepting the alias key. Instances backed by a singleton are adapted once per alias.
    fn adapt(
        &self,
        scope: Scope,
        alias: &Binding,
        cast: &CastFunction,
        instance: AnyInstancePtr,
        applied: &[Key],
    ) -> Result<AnyInstancePtr, ErrorPtr> {
        let key = alias.key();
        if scope == Scope::Singleton {
            if let Some(adapted) = alias.alias_instance(&instance) {
                return Ok(adapted);
            }
        }

        let source = instance.clone();
        let adapted = guarded(|| {
            cast(instance).ok_or_else(|| {
                error_ptr(ResolutionError::IncompatibleInstance {
                    key: key.clone(),
                    requested: key.type_name(),
                })
            })
        })
        .map_err(|cause| wrap_construction_error(key, cause))?;

        match scope {
            Scope::Fixed => Ok(adapted),
            Scope::Factory => self.intercept(key, applied, adapted),
            Scope::Singleton => {
                let adapted = self.intercept(key, applied, adapted)?;
                Ok(alias.store_alias_instance(source, adapted))
            }
        }
    }

    /// Provides an instance of a constructing binding, honoring its scope.
    fn provide(
        &mut self,
        binding: &Binding,
        construction: Construction<'_>,
    ) -> Result<AnyInstancePtr, ErrorPtr> {
        if binding.scope() != Scope::Singleton {
            return self.construct(binding, construction);
        }

        if let Some(instance) = binding.singleton().get() {
            trace!(key = %binding.key(), "Returning cached singleton.");
            return Ok(instance);
        }

        // re-entering the cell from the same request would block forever
        if let Some(cycle) = self.cycle(binding.key()) {
            return Err(cycle);
        }

        // so would waiting for a singleton whose constructor waits for this thread
        let bindings = self.bindings;
        let _wait = bindings
            .initializations()
            .wait_for(binding.key())
            .map_err(|cycle| {
                debug!(key = %binding.key(), "Dependency cycle between threads detected.");
                error_ptr(ResolutionError::DependencyCycle(
                    cycle
                        .iter()
                        .chain(cycle.first())
                        .map(|key| key.to_string())
                        .collect_vec(),
                ))
            })?;

        let mut created = false;
        let instance = binding.singleton().get_or_try_init(|| {
            let _claim = bindings.initializations().claim(binding.key());
            created = true;
            self.construct(binding, construction)
        })?;

        if created {
            bindings.record_singleton(binding, &instance);
        }

        Ok(instance)
    }

    /// Runs the binding constructor and all accepting injection points.
    fn construct(
        &mut self,
        binding: &Binding,
        construction: Construction<'_>,
    ) -> Result<AnyInstancePtr, ErrorPtr> {
        let key = binding.key();
        if let Some(cycle) = self.cycle(key) {
            return Err(cycle);
        }

        debug!(key = %key, scope = %binding.scope(), "Constructing instance.");

        self.chain.push(key.clone());
        let instance = guarded(|| self.invoke(key, construction));
        self.chain.pop();

        let instance = instance.map_err(|cause| wrap_construction_error(key, cause))?;
        self.intercept(key, &[], instance)
    }

    fn invoke(
        &mut self,
        key: &Key,
        construction: Construction<'_>,
    ) -> Result<AnyInstancePtr, ErrorPtr> {
        match construction {
            Construction::Constructor(constructor) => {
                constructor(self as &mut dyn InstanceProvider)
            }
            Construction::Bound(candidates) => self.select_candidate(key, candidates),
        }
    }

    fn intercept(
        &self,
        key: &Key,
        applied: &[Key],
        instance: AnyInstancePtr,
    ) -> Result<AnyInstancePtr, ErrorPtr> {
        guarded(|| {
            self.injection_points
                .apply_excluding(key, applied, instance)
        })
        .map_err(|cause| {
            error_ptr(ResolutionError::InterceptorFailed {
                key: key.clone(),
                cause,
            })
        })
    }

    /// Picks the satisfiable candidate with the most parameters and calls it.
    fn select_candidate(
        &mut self,
        key: &Key,
        candidates: &[ConstructorCandidate],
    ) -> Result<AnyInstancePtr, ErrorPtr> {
        let mut satisfied = Vec::with_capacity(candidates.len());

        'candidates: for candidate in candidates {
            let mut arguments = Vec::with_capacity(candidate.arity());

            for parameter in candidate.parameters() {
                match self.instance(parameter) {
                    Exceptional::Present(instance) => arguments.push((parameter.clone(), instance)),
                    Exceptional::Absent => {
                        trace!(key = %key, parameter = %parameter, "Constructor candidate is not satisfiable.");
                        continue 'candidates;
                    }
                    Exceptional::Failed(cause) => return Err(cause),
                }
            }

            satisfied.push((candidate, arguments));
        }

        let Some(arity) = satisfied.iter().map(|(candidate, _)| candidate.arity()).max() else {
            return Err(error_ptr(ResolutionError::UnsatisfiedConstructor(
                key.clone(),
            )));
        };

        let mut selected = satisfied
            .into_iter()
            .filter(|(candidate, _)| candidate.arity() == arity)
            .collect_vec();

        if selected.len() > 1 {
            return Err(error_ptr(ResolutionError::AmbiguousBinding {
                key: key.clone(),
                arity,
                candidates: selected.len(),
            }));
        }

        match selected.pop() {
            Some((candidate, arguments)) => candidate.construct(Arguments::new(arguments)),
            None => Err(error_ptr(ResolutionError::UnsatisfiedConstructor(
                key.clone(),
            ))),
        }
    }

    // redirects within the same capability would yield duplicates when listing all instances
    fn is_redirect(&self, key: &Key) -> bool {
        self.bindings.binding(key).map_or(false, |binding| {
            matches!(binding.provider().strategy(), Strategy::Alias { target, .. } if target.type_id() == key.type_id())
        })
    }

    fn cycle(&self, key: &Key) -> Option<ErrorPtr> {
        self.chain.iter().position(|entry| entry == key).map(|start| {
            let cycle = self.chain[start..]
                .iter()
                .chain([key])
                .map(|key| key.to_string())
                .collect_vec();

            debug!(key = %key, "Dependency cycle detected.");
            error_ptr(ResolutionError::DependencyCycle(cycle))
        })
    }
}

impl InstanceProvider for Resolver<'_> {
    fn instance(&mut self, key: &Key) -> Exceptional<AnyInstancePtr> {
        trace!(key = %key, "Resolving instance.");
        self.follow(key)
    }

    fn instances(&mut self, type_id: TypeId) -> Result<Vec<(Key, AnyInstancePtr)>, ErrorPtr> {
        let mut instances = Vec::new();
        for key in self.bindings.keys_of(type_id) {
            if self.is_redirect(&key) {
                continue;
            }

            match self.follow(&key) {
                Exceptional::Present(instance) => instances.push((key, instance)),
                Exceptional::Absent => {}
                Exceptional::Failed(cause) => return Err(cause),
            }
        }

        Ok(instances)
    }

    #[inline]
    fn property(&self, name: &str) -> Exceptional<String> {
        self.properties.property(name)
    }
}

// user code never unwinds through a resolution
fn guarded<T, F: FnOnce() -> Result<T, ErrorPtr>>(f: F) -> Result<T, ErrorPtr> {
    catch_unwind(AssertUnwindSafe(f))
        .unwrap_or_else(|payload| Err(error_ptr(CapturedPanic::from_payload(payload))))
}

fn wrap_construction_error(key: &Key, cause: ErrorPtr) -> ErrorPtr {
    if cause.downcast_ref::<ResolutionError>().is_some() {
        return cause;
    }

    if let Some(panic) = cause.downcast_ref::<CapturedPanic>() {
        return error_ptr(ResolutionError::ConstructionPanicked {
            key: key.clone(),
            message: panic.0.clone(),
        });
    }

    error_ptr(ResolutionError::ConstructionFailed {
        key: key.clone(),
        cause,
    })
}
