//! Receiver lvalue and single-evaluation lowering.
//!
//! Compound assignment, increment and decrement, `??=` and deconstruction
//! through a property or indexer call a getter and a setter on the same
//! receiver. The receiver expression and every index argument are
//! evaluated exactly once, receiver first, into temporaries that both
//! calls share.
//!
//! How the receiver is held between the two calls depends on how it is
//! passed; see [`plan_receiver_capture`]. A deconstruction captures every
//! target before evaluating the right-hand side; see
//! [`lower_deconstruction`].

use cinder_diagnostic::{Diagnostic, ErrorCode};
use cinder_ir::Span;
use cinder_types::value_category::value_category;
use cinder_types::{DefId, GenericEnv, Idx, Pool, RefKind, TypeRegistry, ValueCategory};
use smallvec::SmallVec;

use crate::resolve::ExtensionTarget;
use crate::symbols::{ExtensionTable, ForwarderId, ForwarderRole};

/// What lowering needs from the bound world.
#[derive(Copy, Clone)]
pub struct LowerContext<'a> {
    pub pool: &'a Pool,
    pub registry: &'a TypeRegistry,
    /// Type parameters in scope at the assignment.
    pub env: GenericEnv<'a>,
}

impl<'a> LowerContext<'a> {
    pub fn new(pool: &'a Pool, registry: &'a TypeRegistry) -> Self {
        LowerContext {
            pool,
            registry,
            env: GenericEnv::default(),
        }
    }

    #[must_use]
    pub fn with_env(mut self, env: GenericEnv<'a>) -> Self {
        self.env = env;
        self
    }
}

/// The receiver of a property or indexer access.
#[derive(Copy, Clone, Debug)]
pub struct ReceiverExpr {
    pub ty: Idx,
    /// Denotes storage: a local, parameter, field, array element or
    /// by-ref result.
    pub is_variable: bool,
    /// Storage that cannot be written (`readonly` field, `in` parameter).
    pub is_readonly: bool,
    pub span: Span,
}

impl ReceiverExpr {
    pub fn variable(ty: Idx) -> Self {
        ReceiverExpr {
            ty,
            is_variable: true,
            is_readonly: false,
            span: Span::DUMMY,
        }
    }

    /// A call result or other rvalue.
    pub fn value(ty: Idx) -> Self {
        ReceiverExpr {
            is_variable: false,
            ..ReceiverExpr::variable(ty)
        }
    }

    #[must_use]
    pub fn readonly(mut self) -> Self {
        self.is_readonly = true;
        self
    }

    #[must_use]
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }
}

/// How the receiver is held between getter and setter.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum ReceiverCapture {
    /// The address, taken once; both calls receive it. `spill` stores a
    /// non-variable in a temporary first.
    Address { spill: bool },
    /// The address, taken once; each call receives a copy of the value
    /// stored there.
    AddressWithCopies { spill: bool },
    /// The reference, evaluated once.
    Value,
    /// A type parameter of unknown category: at run time a value type
    /// keeps its in-place address and a reference type is loaded once.
    RuntimeCategoryCheck { spill: bool },
}

/// Decide how to capture `receiver` for a member taking it as
/// `ref_kind`.
///
/// By-ref receivers need a variable (and `ref` a writable one). By-value
/// receivers accept any expression, since the member only ever sees a
/// copy.
pub fn plan_receiver_capture(
    ctx: &LowerContext<'_>,
    ref_kind: RefKind,
    receiver: &ReceiverExpr,
) -> Result<ReceiverCapture, Diagnostic> {
    if ref_kind.is_by_ref() {
        if !receiver.is_variable {
            return Err(not_assignable(
                receiver.span,
                format!("a `{}` receiver must be a variable", ref_kind.keyword()),
            ));
        }
        if ref_kind == RefKind::Ref && receiver.is_readonly {
            return Err(not_assignable(
                receiver.span,
                "a read-only variable cannot be passed as a `ref` receiver",
            ));
        }
        return Ok(ReceiverCapture::Address { spill: false });
    }
    let spill = !receiver.is_variable;
    let capture = match value_category(ctx.pool, ctx.registry, &ctx.env, receiver.ty) {
        ValueCategory::Value => ReceiverCapture::AddressWithCopies { spill },
        ValueCategory::Reference => ReceiverCapture::Value,
        ValueCategory::Unknown => ReceiverCapture::RuntimeCategoryCheck { spill },
    };
    tracing::trace!(?capture, "planned receiver capture");
    Ok(capture)
}

fn not_assignable(span: Span, note: impl Into<String>) -> Diagnostic {
    Diagnostic::error(ErrorCode::E3105)
        .with_message("not an assignable receiver")
        .with_label(span, "receiver is not assignable")
        .with_note(note)
}

// === Operations ===

/// Operators of compound assignment.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
}

impl BinaryOp {
    pub const fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitOr => "|",
            BinaryOp::BitXor => "^",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
        }
    }
}

/// An assignment through a property or indexer.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum AssignOp {
    /// `recv.P = rhs`
    Simple,
    /// `recv.P op= rhs`
    Compound(BinaryOp),
    /// `++recv.P` or `recv.P++`
    Increment { prefix: bool },
    /// `--recv.P` or `recv.P--`
    Decrement { prefix: bool },
    /// `recv.P ??= rhs`
    NullCoalescing,
}

impl AssignOp {
    fn reads(self) -> bool {
        !matches!(self, AssignOp::Simple)
    }
}

// === Instructions ===

/// A temporary of the lowered sequence.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, PartialOrd, Ord)]
pub struct Temp(u32);

impl Temp {
    #[inline]
    pub const fn index(self) -> u32 {
        self.0
    }
}

/// How an accessor call receives the captured receiver.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum ReceiverOperand {
    /// Static member.
    None,
    /// The captured address itself.
    Address(Temp),
    /// A fresh copy of the value at the captured address.
    CopyOf(Temp),
    /// The captured reference.
    Value(Temp),
    /// The operand a [`Instr::CategoryCheck`] produced: the in-place
    /// address or the loaded reference.
    Checked(Temp),
}

/// The method an accessor call invokes.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Accessor {
    /// An extension forwarder. `None` for unsupported imported members,
    /// which were already reported at resolution.
    Forwarder(Option<ForwarderId>),
    /// `registry.get(def).members[index]`
    Ordinary { def: DefId, index: usize },
}

/// One step of a lowered assignment.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub enum Instr {
    /// `into = &receiver`, spilling a non-variable into storage first.
    ReceiverAddress { into: Temp, spill: bool },
    /// `into = receiver`
    ReceiverValue { into: Temp },
    /// `stable = address` for a value-type instance, or the reference
    /// loaded once from `address` for a reference-type instance.
    CategoryCheck { address: Temp, stable: Temp },
    /// `into = index argument #index`
    IndexArg { index: usize, into: Temp },
    /// `into = getter(receiver, args)`
    CallGetter {
        accessor: Accessor,
        receiver: ReceiverOperand,
        args: SmallVec<[Temp; 2]>,
        into: Temp,
    },
    /// `into = right-hand side`
    Operand { into: Temp },
    /// `into = lhs op rhs`
    Binary {
        op: BinaryOp,
        lhs: Temp,
        rhs: Temp,
        into: Temp,
    },
    /// `into = value + delta`
    Step { delta: i8, value: Temp, into: Temp },
    /// `into = tuple.Item{element + 1}`
    TupleElement {
        tuple: Temp,
        element: usize,
        into: Temp,
    },
    /// Run `body` only when `value` is null.
    WhenNull { value: Temp, body: Vec<Instr> },
    /// `into = from`
    Copy { from: Temp, into: Temp },
    /// `setter(receiver, args, value)`
    CallSetter {
        accessor: Accessor,
        receiver: ReceiverOperand,
        args: SmallVec<[Temp; 2]>,
        value: Temp,
    },
}

impl Instr {
    /// Whether this step evaluates the receiver expression.
    pub fn evaluates_receiver(&self) -> bool {
        matches!(self, Instr::ReceiverAddress { .. } | Instr::ReceiverValue { .. })
    }
}

/// A lowered assignment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoweredAssignment {
    /// `None` for static members.
    pub capture: Option<ReceiverCapture>,
    pub instrs: Vec<Instr>,
    /// Value of the whole expression.
    pub result: Temp,
    pub temps: u32,
}

impl LoweredAssignment {
    /// Every step in execution order, `WhenNull` bodies inlined.
    pub fn flattened(&self) -> Vec<&Instr> {
        fn walk<'i>(instrs: &'i [Instr], out: &mut Vec<&'i Instr>) {
            for instr in instrs {
                out.push(instr);
                if let Instr::WhenNull { body, .. } = instr {
                    walk(body, out);
                }
            }
        }
        let mut out = Vec::new();
        walk(&self.instrs, &mut out);
        out
    }

    pub fn receiver_evaluations(&self) -> usize {
        self.flattened()
            .into_iter()
            .filter(|i| i.evaluates_receiver())
            .count()
    }
}

// === Lowering ===

/// The accessors of an extension property or indexer.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ExtensionAccess {
    pub getter: Option<ForwarderId>,
    pub setter: Option<ForwarderId>,
    pub receiver_ref_kind: RefKind,
    pub index_args: usize,
    pub is_static: bool,
    /// Imported member whose forwarders failed validation.
    pub unsupported: bool,
}

impl ExtensionAccess {
    /// Accessors of a resolved extension property or indexer.
    pub fn from_target(table: &ExtensionTable, target: &ExtensionTarget, index_args: usize) -> Self {
        let skeleton = table.skeleton(target.member);
        ExtensionAccess {
            getter: target.forwarder(table, ForwarderRole::Getter),
            setter: target.forwarder(table, ForwarderRole::Setter),
            receiver_ref_kind: target.receiver_ref_kind,
            index_args,
            is_static: target.receiver.is_none(),
            unsupported: !skeleton.is_supported(),
        }
    }
}

/// Lower an assignment through an extension property or indexer.
///
/// A missing accessor is reported unless the member is unsupported, in
/// which case resolution already reported it and lowering proceeds with
/// placeholder calls.
#[tracing::instrument(level = "debug", skip_all, fields(op = ?op))]
pub fn lower_extension_assignment(
    ctx: &LowerContext<'_>,
    access: &ExtensionAccess,
    receiver: &ReceiverExpr,
    op: AssignOp,
) -> Result<LoweredAssignment, Diagnostic> {
    let capture = extension_capture(ctx, access, receiver, op.reads())?;
    let accessors = Accessors {
        getter: Accessor::Forwarder(access.getter),
        setter: Accessor::Forwarder(access.setter),
    };
    Ok(lower(capture, accessors, access.index_args, op))
}

/// An ordinary property of the receiver's own type.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct OrdinaryAccess {
    pub def: DefId,
    pub index: usize,
    pub is_static: bool,
}

/// Lower an assignment through an ordinary property.
///
/// Value-type instances receive `this` by reference, so the captured
/// address is passed directly instead of copies.
pub fn lower_ordinary_assignment(
    ctx: &LowerContext<'_>,
    access: &OrdinaryAccess,
    receiver: &ReceiverExpr,
    op: AssignOp,
) -> Result<LoweredAssignment, Diagnostic> {
    let capture = ordinary_capture(ctx, access, receiver)?;
    let accessor = Accessor::Ordinary {
        def: access.def,
        index: access.index,
    };
    let accessors = Accessors {
        getter: accessor,
        setter: accessor,
    };
    Ok(lower(capture, accessors, 0, op))
}

fn extension_capture(
    ctx: &LowerContext<'_>,
    access: &ExtensionAccess,
    receiver: &ReceiverExpr,
    reads: bool,
) -> Result<Option<ReceiverCapture>, Diagnostic> {
    if !access.unsupported {
        if access.setter.is_none() {
            return Err(missing_accessor(receiver.span, "set"));
        }
        if reads && access.getter.is_none() {
            return Err(missing_accessor(receiver.span, "get"));
        }
    }
    if access.is_static {
        return Ok(None);
    }
    plan_receiver_capture(ctx, access.receiver_ref_kind, receiver).map(Some)
}

fn ordinary_capture(
    ctx: &LowerContext<'_>,
    access: &OrdinaryAccess,
    receiver: &ReceiverExpr,
) -> Result<Option<ReceiverCapture>, Diagnostic> {
    if access.is_static {
        return Ok(None);
    }
    let planned = plan_receiver_capture(ctx, RefKind::None, receiver)?;
    Ok(Some(match planned {
        ReceiverCapture::AddressWithCopies { spill } => ReceiverCapture::Address { spill },
        other => other,
    }))
}

fn missing_accessor(span: Span, accessor: &str) -> Diagnostic {
    Diagnostic::error(ErrorCode::E3102)
        .with_message(format!("property or indexer has no `{accessor}` accessor"))
        .with_label(span, "cannot be used in this assignment")
}

#[derive(Copy, Clone)]
struct Accessors {
    getter: Accessor,
    setter: Accessor,
}

#[derive(Default)]
struct Builder {
    instrs: Vec<Instr>,
    temps: u32,
}

impl Builder {
    fn temp(&mut self) -> Temp {
        let temp = Temp(self.temps);
        self.temps += 1;
        temp
    }

    fn push(&mut self, instr: Instr) {
        self.instrs.push(instr);
    }

    fn capture(&mut self, capture: Option<ReceiverCapture>) -> ReceiverOperand {
        let Some(capture) = capture else {
            return ReceiverOperand::None;
        };
        let into = self.temp();
        match capture {
            ReceiverCapture::Address { spill } => {
                self.push(Instr::ReceiverAddress { into, spill });
                ReceiverOperand::Address(into)
            }
            ReceiverCapture::AddressWithCopies { spill } => {
                self.push(Instr::ReceiverAddress { into, spill });
                ReceiverOperand::CopyOf(into)
            }
            ReceiverCapture::Value => {
                self.push(Instr::ReceiverValue { into });
                ReceiverOperand::Value(into)
            }
            ReceiverCapture::RuntimeCategoryCheck { spill } => {
                self.push(Instr::ReceiverAddress { into, spill });
                let stable = self.temp();
                self.push(Instr::CategoryCheck {
                    address: into,
                    stable,
                });
                ReceiverOperand::Checked(stable)
            }
        }
    }

    /// Capture a receiver, then its index arguments.
    fn capture_target(
        &mut self,
        capture: Option<ReceiverCapture>,
        index_args: usize,
    ) -> (ReceiverOperand, SmallVec<[Temp; 2]>) {
        let receiver = self.capture(capture);
        let args = (0..index_args)
            .map(|index| {
                let into = self.temp();
                self.push(Instr::IndexArg { index, into });
                into
            })
            .collect();
        (receiver, args)
    }
}

fn lower(
    capture: Option<ReceiverCapture>,
    accessors: Accessors,
    index_args: usize,
    op: AssignOp,
) -> LoweredAssignment {
    let mut b = Builder::default();
    let (receiver, args) = b.capture_target(capture, index_args);

    let call_getter = |b: &mut Builder| {
        let into = b.temp();
        b.push(Instr::CallGetter {
            accessor: accessors.getter,
            receiver,
            args: args.clone(),
            into,
        });
        into
    };
    let call_setter = |value: Temp| Instr::CallSetter {
        accessor: accessors.setter,
        receiver,
        args: args.clone(),
        value,
    };

    let result = match op {
        AssignOp::Simple => {
            let rhs = b.temp();
            b.push(Instr::Operand { into: rhs });
            b.push(call_setter(rhs));
            rhs
        }
        AssignOp::Compound(op) => {
            let current = call_getter(&mut b);
            let rhs = b.temp();
            b.push(Instr::Operand { into: rhs });
            let updated = b.temp();
            b.push(Instr::Binary {
                op,
                lhs: current,
                rhs,
                into: updated,
            });
            b.push(call_setter(updated));
            updated
        }
        AssignOp::Increment { prefix } | AssignOp::Decrement { prefix } => {
            let delta = if matches!(op, AssignOp::Increment { .. }) { 1 } else { -1 };
            let current = call_getter(&mut b);
            let updated = b.temp();
            b.push(Instr::Step {
                delta,
                value: current,
                into: updated,
            });
            b.push(call_setter(updated));
            if prefix {
                updated
            } else {
                current
            }
        }
        AssignOp::NullCoalescing => {
            let current = call_getter(&mut b);
            let rhs = b.temp();
            let body = vec![
                Instr::Operand { into: rhs },
                call_setter(rhs),
                Instr::Copy {
                    from: rhs,
                    into: current,
                },
            ];
            b.push(Instr::WhenNull {
                value: current,
                body,
            });
            current
        }
    };

    LoweredAssignment {
        capture,
        instrs: b.instrs,
        result,
        temps: b.temps,
    }
}

// === Deconstruction ===

/// One element of a deconstruction target list, `(a.P, b[i]) = rhs`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct DeconstructionTarget {
    capture: Option<ReceiverCapture>,
    setter: Accessor,
    index_args: usize,
}

impl DeconstructionTarget {
    /// An extension property or indexer target. Only the setter is needed.
    pub fn extension(
        ctx: &LowerContext<'_>,
        access: &ExtensionAccess,
        receiver: &ReceiverExpr,
    ) -> Result<Self, Diagnostic> {
        Ok(DeconstructionTarget {
            capture: extension_capture(ctx, access, receiver, false)?,
            setter: Accessor::Forwarder(access.setter),
            index_args: access.index_args,
        })
    }

    /// An ordinary property target.
    pub fn ordinary(
        ctx: &LowerContext<'_>,
        access: &OrdinaryAccess,
        receiver: &ReceiverExpr,
    ) -> Result<Self, Diagnostic> {
        Ok(DeconstructionTarget {
            capture: ordinary_capture(ctx, access, receiver)?,
            setter: Accessor::Ordinary {
                def: access.def,
                index: access.index,
            },
            index_args: 0,
        })
    }
}

/// A lowered deconstruction assignment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoweredDeconstruction {
    /// Per target, in target order.
    pub captures: Vec<Option<ReceiverCapture>>,
    pub instrs: Vec<Instr>,
    /// The right-hand tuple, which is the value of the whole expression.
    pub result: Temp,
    pub temps: u32,
}

impl LoweredDeconstruction {
    pub fn receiver_evaluations(&self) -> usize {
        self.instrs.iter().filter(|i| i.evaluates_receiver()).count()
    }
}

/// Lower `(t0, t1, ..) = rhs`.
///
/// Every receiver and index argument is captured left to right, then the
/// right-hand side is evaluated once, then element `i` goes to the setter
/// of target `i`.
#[tracing::instrument(level = "debug", skip_all, fields(targets = targets.len()))]
pub fn lower_deconstruction(targets: &[DeconstructionTarget]) -> LoweredDeconstruction {
    let mut b = Builder::default();
    let captured: Vec<(ReceiverOperand, SmallVec<[Temp; 2]>)> = targets
        .iter()
        .map(|target| b.capture_target(target.capture, target.index_args))
        .collect();

    let tuple = b.temp();
    b.push(Instr::Operand { into: tuple });
    for (element, (target, (receiver, args))) in targets.iter().zip(captured).enumerate() {
        let value = b.temp();
        b.push(Instr::TupleElement {
            tuple,
            element,
            into: value,
        });
        b.push(Instr::CallSetter {
            accessor: target.setter,
            receiver,
            args,
            value,
        });
    }

    LoweredDeconstruction {
        captures: targets.iter().map(|t| t.capture).collect(),
        instrs: b.instrs,
        result: tuple,
        temps: b.temps,
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]
mod tests;
