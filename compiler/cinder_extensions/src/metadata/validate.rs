//! Structural checks on imported records.
//!
//! Everything here works on records, before anything is decoded into the
//! type graph: two signatures match when their records are equal after
//! the skeleton's type parameter references are renumbered into forwarder
//! space.

use super::records::{
    AccessRecord, GenericParamRecord, MethodRecord, ParamRecord, TypeDefRecord, TypeRecord,
};
use super::{full_name, EXTENSION_ATTRIBUTE, IS_UNMANAGED_ATTRIBUTE, REQUIRES_LOCATION_ATTRIBUTE};
use crate::emit::MARKER_METHOD_NAME;
use crate::symbols::UnsupportedReason;

/// Whether `record` declares extension containers.
pub(crate) fn declares_extensions(record: &TypeDefRecord) -> bool {
    let marker = full_name(EXTENSION_ATTRIBUTE);
    record.attributes.iter().any(|a| a.is(&marker))
}

/// Index of the marker method if `nested` is a well-formed container of
/// `declaring`. `None` means it is an ordinary nested type.
pub(crate) fn container_marker(declaring: &TypeDefRecord, nested: &TypeDefRecord) -> Option<usize> {
    if !nested.has_flag(super::records::type_flags::SEALED) {
        return None;
    }
    if nested.access > declaring.access {
        return None;
    }
    if nested.base.as_ref().is_some_and(|b| !b.is_object()) || !nested.interfaces.is_empty() {
        return None;
    }
    let mut eligible = nested
        .methods
        .iter()
        .enumerate()
        .filter(|(_, m)| m.name == MARKER_METHOD_NAME && is_eligible_marker(m))
        .map(|(i, _)| i);
    let first = eligible.next()?;
    if eligible.next().is_some() {
        return None;
    }
    Some(first)
}

fn is_eligible_marker(method: &MethodRecord) -> bool {
    method.is_static
        && method.params.len() == 1
        && method.ret.ty.is_void()
        && !method.ret.by_ref
        && method.generic_params.is_empty()
}

/// Locate the forwarder of one skeleton method (or accessor) on the
/// declaring type.
///
/// The first candidate passing every check wins. When none does, the
/// reason from the candidate that got furthest is returned.
pub(crate) fn match_forwarder(
    declaring: &TypeDefRecord,
    container: &TypeDefRecord,
    marker: &ParamRecord,
    skeleton: &MethodRecord,
) -> Result<usize, UnsupportedReason> {
    let expected = Expected::new(container, marker, skeleton);
    let mut best = UnsupportedReason::MissingForwarder;
    for (index, candidate) in declaring.methods.iter().enumerate() {
        if candidate.name != skeleton.name {
            continue;
        }
        match expected.check(candidate) {
            Ok(()) => return Ok(index),
            Err(reason) => best = best.max(reason),
        }
    }
    tracing::debug!(member = %skeleton.name, reason = %best, "no matching forwarder");
    Err(best)
}

/// A skeleton's signature as its forwarder must spell it.
struct Expected<'r> {
    access: AccessRecord,
    receiver: Option<ParamRecord>,
    params: Vec<ParamRecord>,
    ret: ParamRecord,
    generic_params: Vec<&'r GenericParamRecord>,
    constraints: Vec<Vec<TypeRecord>>,
}

impl<'r> Expected<'r> {
    fn new(container: &'r TypeDefRecord, marker: &ParamRecord, skeleton: &'r MethodRecord) -> Self {
        #[expect(
            clippy::cast_possible_truncation,
            reason = "container arity is far below u32::MAX"
        )]
        let arity = container.generic_params.len() as u32;
        let to_forwarder = move |method: bool, ordinal: u32| {
            if method {
                (true, arity + ordinal)
            } else {
                (true, ordinal)
            }
        };
        let map_param = |p: &ParamRecord| ParamRecord {
            ty: p.ty.map_type_params(&to_forwarder),
            ..p.clone()
        };

        let generic_params: Vec<&GenericParamRecord> = container
            .generic_params
            .iter()
            .chain(&skeleton.generic_params)
            .collect();
        let constraints = generic_params
            .iter()
            .map(|g| {
                g.constraints
                    .iter()
                    .map(|c| c.ty.map_type_params(&to_forwarder))
                    .collect()
            })
            .collect();

        Expected {
            access: skeleton.access,
            receiver: (!skeleton.is_static).then(|| map_param(marker)),
            params: skeleton.params.iter().map(map_param).collect(),
            ret: map_param(&skeleton.ret),
            generic_params,
            constraints,
        }
    }

    fn check(&self, candidate: &MethodRecord) -> Result<(), UnsupportedReason> {
        if !candidate.is_static {
            return Err(UnsupportedReason::ForwarderNotStatic);
        }
        let receiver_count = usize::from(self.receiver.is_some());
        if candidate.params.len() != self.params.len() + receiver_count {
            return Err(UnsupportedReason::ParameterCountMismatch);
        }
        if candidate.generic_params.len() != self.generic_params.len() {
            return Err(UnsupportedReason::GenericArityMismatch);
        }
        if candidate.access != self.access {
            return Err(UnsupportedReason::AccessibilityMismatch);
        }
        if let Some(receiver) = &self.receiver {
            if !same_param(receiver, &candidate.params[0]) {
                return Err(UnsupportedReason::ReceiverMismatch);
            }
        }
        let params_match = self
            .params
            .iter()
            .zip(&candidate.params[receiver_count..])
            .all(|(a, b)| same_param(a, b));
        if !params_match {
            return Err(UnsupportedReason::ParameterMismatch);
        }
        if !same_return(&self.ret, &candidate.ret) {
            return Err(UnsupportedReason::ReturnTypeMismatch);
        }
        let constraints_match = self
            .generic_params
            .iter()
            .zip(&self.constraints)
            .zip(&candidate.generic_params)
            .all(|((expected, types), actual)| same_constraints(expected, types, actual));
        if !constraints_match {
            return Err(UnsupportedReason::ConstraintMismatch);
        }
        Ok(())
    }
}

fn same_param(a: &ParamRecord, b: &ParamRecord) -> bool {
    let requires_location = full_name(REQUIRES_LOCATION_ATTRIBUTE);
    let has = |p: &ParamRecord| p.attributes.iter().any(|a| a.is(&requires_location));
    a.ty == b.ty && a.by_ref == b.by_ref && a.modreqs == b.modreqs && has(a) == has(b)
}

fn same_return(a: &ParamRecord, b: &ParamRecord) -> bool {
    a.ty == b.ty && a.by_ref == b.by_ref && a.modreqs == b.modreqs
}

fn same_constraints(
    expected: &GenericParamRecord,
    types: &[TypeRecord],
    actual: &GenericParamRecord,
) -> bool {
    let unmanaged = full_name(IS_UNMANAGED_ATTRIBUTE);
    let has = |g: &GenericParamRecord| g.attributes.iter().any(|a| a.is(&unmanaged));
    expected.flags == actual.flags
        && has(expected) == has(actual)
        && types.len() == actual.constraints.len()
        && types.iter().zip(&actual.constraints).all(|(t, c)| *t == c.ty)
}
