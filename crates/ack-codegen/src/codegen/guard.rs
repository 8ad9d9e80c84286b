//! Presence guards around nullable values.
//!
//! Two-sided guards protect comparisons of the same field in two instances,
//! single-sided guards protect access chains into one instance.

use crate::{
    codegen::{Emitter, kernel::Operands},
    model::{ScalarKind, Shape, ShapeKind},
};

/// Returns true if values of this shape can be absent and therefore need a
/// presence check before they are compared.
///
/// Sequences and byte blobs encode absence as zero length, so they are
/// compared by length instead.
pub fn is_nullable(shape: &Shape) -> bool {
    !matches!(
        shape.kind(),
        ShapeKind::Sequence(_) | ShapeKind::Scalar(ScalarKind::Blob)
    )
}

/// Opens a two-sided guard. `on_difference` runs if exactly one side is
/// absent, the block left open afterwards runs if both sides are present.
/// Close it with [`close`].
pub fn open_two_sided(out: &mut Emitter, level: usize, operands: &Operands, on_difference: &str) {
    let Operands { a, b } = operands;

    out.line(level, format!("if ackcompare.HasNilDifference({a}, {b}) {{"));
    out.line(level + 1, on_difference);
    out.line(level, format!("}} else if {a} != nil && {b} != nil {{"));
}

/// Emits a single-sided guard which runs `on_absent` if `expr` is absent.
pub fn absent(out: &mut Emitter, level: usize, expr: &str, on_absent: &str) {
    out.line(level, format!("if {expr} == nil {{"));
    out.line(level + 1, on_absent);
    out.line(level, "}");
}

/// Opens a single-sided guard whose block runs if `expr` is present. Close
/// it with [`close`].
pub fn open_present(out: &mut Emitter, level: usize, expr: &str) {
    out.line(level, format!("if {expr} != nil {{"));
}

pub fn close(out: &mut Emitter, level: usize) {
    out.line(level, "}");
}

/// Renders a condition which holds if every step of the access chain is
/// present, like `a.B != nil && a.B.C != nil`.
pub fn presence_chain<'a>(root: &str, path: impl IntoIterator<Item = &'a str>) -> String {
    chain(root, path, "!= nil", " && ")
}

/// Renders a condition which holds if any step of the access chain is
/// absent, like `a.B == nil || a.B.C == nil`.
pub fn absence_chain<'a>(root: &str, path: impl IntoIterator<Item = &'a str>) -> String {
    chain(root, path, "== nil", " || ")
}

fn chain<'a>(
    root: &str,
    path: impl IntoIterator<Item = &'a str>,
    test: &str,
    separator: &str,
) -> String {
    let mut access = root.to_owned();
    let mut terms = Vec::new();

    for part in path {
        access.push('.');
        access.push_str(part);
        terms.push(format!("{access} {test}"));
    }

    terms.join(separator)
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(Shape::scalar(ScalarKind::String), true)]
    #[case(Shape::scalar(ScalarKind::Timestamp), true)]
    #[case(Shape::scalar(ScalarKind::Blob), false)]
    #[case(Shape::structure("Config", [("Name", Shape::scalar(ScalarKind::String))]), true)]
    #[case(Shape::sequence(Shape::scalar(ScalarKind::String)), false)]
    #[case(Shape::mapping(ScalarKind::String, Shape::scalar(ScalarKind::String)), true)]
    fn nullable_shapes(#[case] shape: Shape, #[case] expected: bool) {
        assert_eq!(is_nullable(&shape), expected);
    }

    #[test]
    fn two_sided_guard() {
        let mut out = Emitter::new();
        let operands = Operands::new("a.ko.Spec.Name", "b.ko.Spec.Name");

        open_two_sided(&mut out, 1, &operands, "return false");
        out.line(2, "// compare");
        close(&mut out, 1);

        assert_eq!(
            out.finish(),
            "\tif ackcompare.HasNilDifference(a.ko.Spec.Name, b.ko.Spec.Name) {\n\
             \t\treturn false\n\
             \t} else if a.ko.Spec.Name != nil && b.ko.Spec.Name != nil {\n\
             \t\t// compare\n\
             \t}\n"
        );
    }

    #[test]
    fn chains() {
        assert_eq!(
            absence_chain("obj.Status", ["ACKResourceMetadata", "ARN"]),
            "obj.Status.ACKResourceMetadata == nil || obj.Status.ACKResourceMetadata.ARN == nil"
        );
        assert_eq!(
            presence_chain("ko.Spec", ["JWTConfiguration", "IssuerRef"]),
            "ko.Spec.JWTConfiguration != nil && ko.Spec.JWTConfiguration.IssuerRef != nil"
        );
    }
}
