//! Overload resolution for function, method, and constructor calls.
//!
//! ## Algorithm
//!
//! 1. Filter candidates by parameter count
//! 2. Reject any candidate receiving a `void` argument
//! 3. Accumulate the conversion cost of every argument; a lambda literal
//!    passed to a functional interface costs 1
//! 4. Stable-sort survivors by total cost and keep the cheapest; ties keep
//!    the candidate declared first
//!
//! Calls synthesized by the compiler use [`resolve_exact`], which returns
//! `None` instead of failing.

mod ranking;

pub use ranking::{Ranked, rank};

use ixion_core::{CompilationError, SemanticType, Span, render_types};
use ixion_registry::{HostClassDescriptor, HostConstructor, HostMethod, HostTypeResolver};
use tracing::debug;

use crate::conversion::classify;
use crate::scope::CallableCandidate;

/// The parameter list of something callable.
pub trait Signature {
    fn params(&self) -> &[SemanticType];
}

impl Signature for CallableCandidate {
    fn params(&self) -> &[SemanticType] {
        CallableCandidate::params(self)
    }
}

impl Signature for HostMethod {
    fn params(&self) -> &[SemanticType] {
        &self.params
    }
}

impl Signature for HostConstructor {
    fn params(&self) -> &[SemanticType] {
        &self.params
    }
}

impl<T: Signature> Signature for &T {
    fn params(&self) -> &[SemanticType] {
        T::params(self)
    }
}

impl Signature for (&HostClassDescriptor, &HostMethod) {
    fn params(&self) -> &[SemanticType] {
        &self.1.params
    }
}

/// What overload resolution knows about one argument.
#[derive(Debug, Clone, PartialEq)]
pub struct ArgInfo {
    pub ty: SemanticType,
    /// The argument is a lambda literal.
    pub is_lambda: bool,
}

impl ArgInfo {
    pub fn new(ty: SemanticType) -> Self {
        Self { ty, is_lambda: false }
    }

    pub fn lambda(ty: SemanticType) -> Self {
        Self { ty, is_lambda: true }
    }
}

/// Which conversions arguments may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Policy {
    /// Accept boxing and unboxing at cost 3 (host calls).
    pub boxing: bool,
}

impl Policy {
    pub const SCOPE: Policy = Policy { boxing: false };
    pub const HOST: Policy = Policy { boxing: true };
}

/// Resolve a call against an overload set.
///
/// # Arguments
///
/// * `resolver` - Host type universe for reference conversions
/// * `name` - Called name, for diagnostics
/// * `candidates` - The overload set in declaration order
/// * `args` - Argument types at the call site
/// * `policy` - Allowed conversions
/// * `span` - Call site
///
/// # Returns
///
/// The cheapest candidate, or `NoApplicableOverload`.
pub fn resolve<'c, C: Signature>(
    resolver: &dyn HostTypeResolver,
    name: &str,
    candidates: &'c [C],
    args: &[ArgInfo],
    policy: Policy,
    span: Span,
) -> Result<Ranked<'c, C>, CompilationError> {
    let mut ranked = rank(resolver, candidates, args, policy);
    if ranked.is_empty() {
        debug!(callee = name, arguments = %render_arguments(args), "no applicable overload");
        return Err(no_applicable_overload(name, args, span));
    }
    let best = ranked.swap_remove(0);
    debug!(callee = name, cost = best.cost, index = best.index, "resolved overload");
    Ok(best)
}

/// Exact resolution for compiler-generated calls: the first candidate whose
/// parameters accept every argument without boxing, or `None`.
pub fn resolve_exact<'c, C: Signature>(
    resolver: &dyn HostTypeResolver,
    candidates: &'c [C],
    args: &[SemanticType],
) -> Option<&'c C> {
    candidates.iter().find(|candidate| {
        let params = candidate.params();
        params.len() == args.len()
            && params
                .iter()
                .zip(args)
                .all(|(param, arg)| classify(resolver, param, arg).is_some())
    })
}

pub fn render_arguments(args: &[ArgInfo]) -> String {
    let types: Vec<SemanticType> = args.iter().map(|a| a.ty.clone()).collect();
    render_types(&types)
}

pub fn no_applicable_overload(name: &str, args: &[ArgInfo], span: Span) -> CompilationError {
    CompilationError::NoApplicableOverload {
        name: name.to_string(),
        arguments: render_arguments(args),
        span,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::Dispatch;
    use ixion_registry::{HostRegistry, function_interface};

    fn candidate(params: Vec<SemanticType>) -> CallableCandidate {
        CallableCandidate::new("f", "mainixc", params, SemanticType::VOID, Dispatch::Static)
    }

    fn args(types: &[SemanticType]) -> Vec<ArgInfo> {
        types.iter().cloned().map(ArgInfo::new).collect()
    }

    #[test]
    fn int_plus_double_picks_double_overload() {
        let registry = HostRegistry::with_prelude();
        let set = [candidate(vec![SemanticType::INT]), candidate(vec![SemanticType::DOUBLE])];
        let best = resolve(
            &registry,
            "print",
            &set,
            &args(&[SemanticType::DOUBLE]),
            Policy::SCOPE,
            Span::default(),
        )
        .unwrap();
        assert_eq!(best.index, 1);
        assert_eq!(best.cost, 0);
    }

    #[test]
    fn cheaper_candidate_wins_in_either_order() {
        let registry = HostRegistry::with_prelude();
        let long = candidate(vec![SemanticType::LONG]);
        let int = candidate(vec![SemanticType::INT]);
        let forward = [long.clone(), int.clone()];
        let backward = [int, long];
        let arg = args(&[SemanticType::INT]);
        let a = resolve(&registry, "f", &forward, &arg, Policy::SCOPE, Span::default()).unwrap();
        let b = resolve(&registry, "f", &backward, &arg, Policy::SCOPE, Span::default()).unwrap();
        assert_eq!(a.candidate.params(), &[SemanticType::INT]);
        assert_eq!(b.candidate.params(), &[SemanticType::INT]);
    }

    #[test]
    fn ties_keep_first_declared() {
        let registry = HostRegistry::with_prelude();
        let set = [candidate(vec![SemanticType::LONG]), candidate(vec![SemanticType::FLOAT])];
        let best = resolve(
            &registry,
            "f",
            &set,
            &args(&[SemanticType::INT]),
            Policy::SCOPE,
            Span::default(),
        )
        .unwrap();
        assert_eq!(best.index, 0);
    }

    #[test]
    fn void_argument_rejects_candidate() {
        let registry = HostRegistry::with_prelude();
        let set = [candidate(vec![SemanticType::INT])];
        let err = resolve(
            &registry,
            "f",
            &set,
            &args(&[SemanticType::VOID]),
            Policy::SCOPE,
            Span::new(3, 1, 1),
        )
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "at 3:1: Could not resolve function 'f' with arguments: void"
        );
    }

    #[test]
    fn boxing_only_for_host_policy() {
        let registry = HostRegistry::with_prelude();
        let set = [candidate(vec![SemanticType::object()])];
        let arg = args(&[SemanticType::INT]);
        assert!(rank(&registry, &set, &arg, Policy::SCOPE).is_empty());
        let ranked = rank(&registry, &set, &arg, Policy::HOST);
        assert_eq!(ranked[0].cost, 3);
    }

    #[test]
    fn lambda_matches_functional_parameter() {
        let registry = HostRegistry::with_prelude();
        let set = [candidate(vec![SemanticType::reference("java/lang/Runnable")])];
        let arg = vec![ArgInfo::lambda(SemanticType::reference(&function_interface(0)))];
        let ranked = rank(&registry, &set, &arg, Policy::SCOPE);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].cost, 1);
    }

    #[test]
    fn exact_resolution_returns_none() {
        let registry = HostRegistry::with_prelude();
        let ctor = registry
            .resolve_host_class("java/lang/Throwable")
            .unwrap()
            .constructors
            .clone();
        assert!(resolve_exact(&registry, &ctor, &[]).is_some());
        assert!(resolve_exact(&registry, &ctor, &[SemanticType::INT]).is_none());
    }
}
