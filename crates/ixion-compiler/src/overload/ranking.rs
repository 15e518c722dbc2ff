//! Cost-based ranking of overload candidates.

use ixion_core::SemanticType;
use ixion_registry::HostTypeResolver;

use super::{ArgInfo, Policy, Signature};
use crate::conversion::{ConversionKind, classify, classify_with_boxing};

/// A viable candidate with its conversions.
#[derive(Debug)]
pub struct Ranked<'c, C> {
    pub candidate: &'c C,
    /// Position in the overload set.
    pub index: usize,
    /// Total conversion cost (lower is better).
    pub cost: u32,
    /// One conversion per argument.
    pub conversions: Vec<ConversionKind>,
}

/// Every viable candidate, cheapest first. Equal costs keep declaration
/// order.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn rank<'c, C: Signature>(
    resolver: &dyn HostTypeResolver,
    candidates: &'c [C],
    args: &[ArgInfo],
    policy: Policy,
) -> Vec<Ranked<'c, C>> {
    let mut viable: Vec<Ranked<'c, C>> = candidates
        .iter()
        .enumerate()
        .filter_map(|(index, candidate)| {
            let conversions = match_arguments(resolver, candidate.params(), args, policy)?;
            let cost = conversions
                .iter()
                .map(|c| c.cost())
                .fold(0u32, u32::saturating_add);
            Some(Ranked {
                candidate,
                index,
                cost,
                conversions,
            })
        })
        .collect();
    viable.sort_by_key(|r| r.cost);
    viable
}

fn match_arguments(
    resolver: &dyn HostTypeResolver,
    params: &[SemanticType],
    args: &[ArgInfo],
    policy: Policy,
) -> Option<Vec<ConversionKind>> {
    if params.len() != args.len() {
        return None;
    }
    params
        .iter()
        .zip(args)
        .map(|(param, arg)| {
            if arg.ty.is_void() {
                return None;
            }
            let direct = if policy.boxing {
                classify_with_boxing(resolver, param, &arg.ty)
            } else {
                classify(resolver, param, &arg.ty)
            };
            match direct {
                Some(kind) => Some(kind),
                None if arg.is_lambda && is_functional(resolver, param) => {
                    Some(ConversionKind::LambdaToFunctional)
                }
                None => None,
            }
        })
        .collect()
}

fn is_functional(resolver: &dyn HostTypeResolver, param: &SemanticType) -> bool {
    match param {
        SemanticType::Reference { name, .. } => resolver.functional_method(name).is_some(),
        _ => false,
    }
}
