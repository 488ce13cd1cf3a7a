//! Patterns matched on the syntax tree of bundle code

use swc_core::ecma::ast::{
    BinaryOp, CallExpr, Callee, Expr, IfStmt, Lit, MemberProp, ObjectLit, Prop, PropName,
    PropOrSpread, UnaryOp,
};
use swc_core::ecma::visit::{Visit, VisitWith};

use super::script::{parse_script, ParseError, SpanMap};
use super::{ByteRange, REQUIRE_CALLEES};

/// A `require(<id>)` call found in a piece of code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Invocation {
    pub target: usize,
    /// From the callee to the closing parenthesis
    pub range: ByteRange,
}

/// Read a call to one of the require callees whose first argument is an integer
///
/// Member calls such as `foo.require(1)` are not invocations.
pub(crate) fn numeric_invocation(call: &CallExpr, spans: SpanMap) -> Option<Invocation> {
    let Callee::Expr(callee) = &call.callee else {
        return None;
    };
    let Expr::Ident(ident) = &**callee else {
        return None;
    };
    if !REQUIRE_CALLEES.contains(&&*ident.sym) {
        return None;
    }
    let first = call.args.first().filter(|arg| arg.spread.is_none())?;
    let Expr::Lit(Lit::Num(number)) = &*first.expr else {
        return None;
    };
    if number.value < 0.0 || number.value.fract() != 0.0 {
        return None;
    }
    Some(Invocation {
        target: number.value as usize,
        range: spans.range(call.span),
    })
}

/// Collects numeric invocations in source order
pub(crate) struct InvocationCollector {
    spans: SpanMap,
    pub found: Vec<Invocation>,
}

impl InvocationCollector {
    pub(crate) fn new(spans: SpanMap) -> Self {
        Self {
            spans,
            found: Vec::new(),
        }
    }
}

impl Visit for InvocationCollector {
    fn visit_call_expr(&mut self, call: &CallExpr) {
        match numeric_invocation(call, self.spans) {
            Some(invocation) => self.found.push(invocation),
            None => call.visit_children_with(self),
        }
    }
}

/// Find every invocation of a module by numeric id in `text`
///
/// Extra arguments after the id are ignored. Ranges are relative to `text`.
pub fn find_invocations(text: &str) -> Result<Vec<Invocation>, ParseError> {
    let parsed = parse_script(text, 0)?;
    let mut collector = InvocationCollector::new(parsed.spans);
    parsed.script.visit_with(&mut collector);
    Ok(collector.found)
}

/// Locate the development-only guard in the require polyfill
///
/// Matches `if (__DEV__ && typeof x === 'string') {..} else {..}` in
/// development output and the minified `if (__DEV__ && 'string' == typeof x)`
/// form in production output. The returned range covers the whole `if`
/// statement, alternate branch included.
pub fn find_dev_guard(text: &str, dev: bool) -> Result<Option<ByteRange>, ParseError> {
    let parsed = parse_script(text, 0)?;
    let mut finder = DevGuardFinder {
        dev,
        spans: parsed.spans,
        found: None,
    };
    parsed.script.visit_with(&mut finder);
    Ok(finder.found)
}

struct DevGuardFinder {
    dev: bool,
    spans: SpanMap,
    found: Option<ByteRange>,
}

impl Visit for DevGuardFinder {
    fn visit_if_stmt(&mut self, stmt: &IfStmt) {
        if self.found.is_some() {
            return;
        }
        if is_dev_test(&stmt.test, self.dev) {
            self.found = Some(self.spans.range(stmt.span));
            return;
        }
        stmt.visit_children_with(self);
    }
}

fn is_dev_test(test: &Expr, dev: bool) -> bool {
    let Expr::Bin(and) = test else {
        return false;
    };
    let guarded_by_dev = matches!(&*and.left, Expr::Ident(i) if &*i.sym == "__DEV__");
    if and.op != BinaryOp::LogicalAnd || !guarded_by_dev {
        return false;
    }
    let Expr::Bin(comparison) = &*and.right else {
        return false;
    };
    if dev {
        comparison.op == BinaryOp::EqEqEq
            && is_typeof(&comparison.left)
            && is_string(&comparison.right)
    } else {
        comparison.op == BinaryOp::EqEq
            && is_string(&comparison.left)
            && is_typeof(&comparison.right)
    }
}

fn is_typeof(expr: &Expr) -> bool {
    matches!(expr, Expr::Unary(unary) if unary.op == UnaryOp::TypeOf)
}

fn is_string(expr: &Expr) -> bool {
    matches!(expr, Expr::Lit(Lit::Str(_)))
}

/// A literal value inside an object literal
#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    Str(String),
    /// Raw numeric text, as written
    Number(String),
    Bool(bool),
    Null,
    Array(Vec<LiteralValue>),
    /// Anything that is not a plain literal
    Expression,
}

/// Fields of an object literal in source order
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectLiteral {
    pub range: ByteRange,
    pub fields: Vec<(String, LiteralValue)>,
}

impl ObjectLiteral {
    pub fn get(&self, key: &str) -> Option<&LiteralValue> {
        self.fields.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }
}

/// Finds the object literal passed as first argument to a named callee
///
/// `callee` matches both `callee({..})` and `x.callee({..})`. The first
/// object passed directly to any call is kept as a fallback.
pub(crate) struct ObjectArgFinder<'a> {
    callee: &'a str,
    source: &'a str,
    spans: SpanMap,
    named: Option<ObjectLiteral>,
    fallback: Option<ObjectLiteral>,
}

impl<'a> ObjectArgFinder<'a> {
    pub(crate) fn new(callee: &'a str, source: &'a str, spans: SpanMap) -> Self {
        Self {
            callee,
            source,
            spans,
            named: None,
            fallback: None,
        }
    }

    pub(crate) fn finish(self) -> Option<ObjectLiteral> {
        self.named.or(self.fallback)
    }
}

impl Visit for ObjectArgFinder<'_> {
    fn visit_call_expr(&mut self, call: &CallExpr) {
        if self.named.is_some() {
            return;
        }
        let object = call.args.first().and_then(|arg| match &*arg.expr {
            Expr::Object(object) if arg.spread.is_none() => Some(object),
            _ => None,
        });
        if let Some(object) = object {
            if callee_is(&call.callee, self.callee) {
                self.named = Some(object_literal(object, self.source, self.spans));
                return;
            }
            if self.fallback.is_none() {
                self.fallback = Some(object_literal(object, self.source, self.spans));
            }
        }
        call.visit_children_with(self);
    }
}

fn callee_is(callee: &Callee, name: &str) -> bool {
    let Callee::Expr(expr) = callee else {
        return false;
    };
    match &**expr {
        Expr::Ident(ident) => &*ident.sym == name,
        Expr::Member(member) => {
            matches!(&member.prop, MemberProp::Ident(prop) if &*prop.sym == name)
        }
        _ => false,
    }
}

/// Find the object literal passed as first argument to `callee(...)`
///
/// Falls back to the first object literal passed directly to any call when
/// no call to `callee` carries one. The range is relative to `text`.
pub fn find_object_literal(text: &str, callee: &str) -> Result<Option<ObjectLiteral>, ParseError> {
    let parsed = parse_script(text, 0)?;
    let mut finder = ObjectArgFinder::new(callee, text, parsed.spans);
    parsed.script.visit_with(&mut finder);
    Ok(finder.finish())
}

fn object_literal(object: &ObjectLit, source: &str, spans: SpanMap) -> ObjectLiteral {
    let mut fields = Vec::new();
    for prop in &object.props {
        let PropOrSpread::Prop(prop) = prop else {
            continue;
        };
        let Prop::KeyValue(entry) = &**prop else {
            continue;
        };
        let key = match &entry.key {
            PropName::Ident(ident) => ident.sym.to_string(),
            PropName::Str(s) => s.value.to_string(),
            PropName::Num(n) => spans.range(n.span).slice(source).to_string(),
            _ => continue,
        };
        fields.push((key, literal_value(&entry.value, source, spans)));
    }
    ObjectLiteral {
        range: spans.range(object.span),
        fields,
    }
}

fn literal_value(expr: &Expr, source: &str, spans: SpanMap) -> LiteralValue {
    match expr {
        Expr::Lit(Lit::Str(s)) => LiteralValue::Str(s.value.to_string()),
        Expr::Lit(Lit::Num(n)) => LiteralValue::Number(spans.range(n.span).slice(source).into()),
        Expr::Lit(Lit::Bool(b)) => LiteralValue::Bool(b.value),
        Expr::Lit(Lit::Null(_)) => LiteralValue::Null,
        Expr::Unary(unary) => match (unary.op, &*unary.arg) {
            (UnaryOp::Minus, Expr::Lit(Lit::Num(n))) => {
                LiteralValue::Number(format!("-{}", spans.range(n.span).slice(source)))
            }
            // minifiers write booleans as `!0` and `!1`
            (UnaryOp::Bang, Expr::Lit(Lit::Num(n))) => LiteralValue::Bool(n.value == 0.0),
            _ => LiteralValue::Expression,
        },
        Expr::Array(array) => LiteralValue::Array(
            array
                .elems
                .iter()
                .flatten()
                .map(|element| literal_value(&element.expr, source, spans))
                .collect(),
        ),
        _ => LiteralValue::Expression,
    }
}
