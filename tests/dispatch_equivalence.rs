//! Every kind-specialized path against the same operation on dense copies

use proptest::prelude::*;
use trueno_linalg::{BinaryOp, HpMatrix, Kind, RealValue};

const SQUARE: [Kind; 5] = [
    Kind::Full,
    Kind::Diagonal,
    Kind::Symmetric,
    Kind::UpperTriangular,
    Kind::LowerTriangular,
];

const OPS: [BinaryOp; 15] = [
    BinaryOp::Add,
    BinaryOp::Sub,
    BinaryOp::Div,
    BinaryOp::Rem,
    BinaryOp::Pow,
    BinaryOp::Eq,
    BinaryOp::Ne,
    BinaryOp::Lt,
    BinaryOp::Gt,
    BinaryOp::Le,
    BinaryOp::Ge,
    BinaryOp::And,
    BinaryOp::Or,
    BinaryOp::Xor,
    BinaryOp::Mul,
];

fn build(kind: Kind, n: usize, values: &[f64]) -> HpMatrix {
    let cols = if kind == Kind::Column { 1 } else { n };
    HpMatrix::from_fn(kind, n, cols, |i, j| values[i * n + j]).unwrap()
}

fn dense(m: &HpMatrix) -> HpMatrix {
    HpMatrix::from_storage(m.storage().to_full(), m.units())
}

fn same(x: f64, y: f64) -> bool {
    (x.is_nan() && y.is_nan()) || x == y || (x - y).abs() <= 1e-12 * x.abs().max(1.0)
}

fn assert_logically_equal(a: &HpMatrix, b: &HpMatrix) -> Result<(), TestCaseError> {
    prop_assert_eq!((a.rows(), a.cols()), (b.rows(), b.cols()));
    prop_assert_eq!(a.units(), b.units());
    for i in 0..a.rows() {
        for j in 0..a.cols() {
            let (x, y) = (a.get(i, j), b.get(i, j));
            prop_assert!(same(x, y), "({}, {}): {} vs {}", i, j, x, y);
        }
    }
    Ok(())
}

fn sized() -> impl Strategy<Value = (usize, Vec<f64>, Vec<f64>)> {
    (1usize..6).prop_flat_map(|n| {
        (
            Just(n),
            prop::collection::vec(prop_oneof![Just(0.0), 0.5f64..3.0, -3.0f64..-0.5], n * n),
            prop::collection::vec(prop_oneof![Just(0.0), 0.5f64..3.0, -3.0f64..-0.5], n * n),
        )
    })
}

// ============================================================================
// Element-wise operators
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn prop_binary_ops_match_dense((n, x, y) in sized()) {
        for &ka in &SQUARE {
            for &kb in &SQUARE {
                let a = build(ka, n, &x);
                let b = build(kb, n, &y);
                for op in OPS {
                    let fast = a.apply(op, &b).unwrap();
                    let slow = dense(&a).apply(op, &dense(&b)).unwrap();
                    assert_logically_equal(&fast, &slow)?;
                }
            }
        }
    }

    #[test]
    fn prop_column_ops_match_dense((n, x, y) in sized()) {
        let a = build(Kind::Column, n, &x);
        let b = build(Kind::Column, n, &y);
        for op in OPS.iter().copied().filter(|&op| op != BinaryOp::Mul) {
            let fast = a.apply(op, &b).unwrap();
            let slow = dense(&a).apply(op, &dense(&b)).unwrap();
            assert_logically_equal(&fast, &slow)?;
        }
    }

    #[test]
    fn prop_scalar_ops_match_dense((n, x, _y) in sized(), s in prop_oneof![Just(0.0), 0.5f64..3.0]) {
        let scalar = RealValue::new(s);
        for &kind in &SQUARE {
            let a = build(kind, n, &x);
            for op in OPS {
                let fast = a.apply_scalar(op, scalar).unwrap();
                let slow = dense(&a).apply_scalar(op, scalar).unwrap();
                assert_logically_equal(&fast, &slow)?;
                let fast = HpMatrix::scalar_apply(scalar, op, &a).unwrap();
                let slow = HpMatrix::scalar_apply(scalar, op, &dense(&a)).unwrap();
                assert_logically_equal(&fast, &slow)?;
            }
        }
    }
}

// ============================================================================
// Products
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn prop_products_match_dense((n, x, y) in sized()) {
        for &ka in &SQUARE {
            let a = build(ka, n, &x);
            for &kb in &SQUARE {
                let b = build(kb, n, &y);
                let fast = a.product(&b).unwrap();
                let slow = dense(&a).product(&dense(&b)).unwrap();
                assert_logically_equal(&fast, &slow)?;
            }
            let c = build(Kind::Column, n, &y);
            let fast = a.product(&c).unwrap();
            prop_assert_eq!(fast.kind(), Kind::Column);
            let slow = dense(&a).product(&dense(&c)).unwrap();
            assert_logically_equal(&fast, &slow)?;
        }
    }

    #[test]
    fn prop_transpose_and_hadamard_match_dense((n, x, y) in sized()) {
        for &kind in &SQUARE {
            let a = build(kind, n, &x);
            let b = build(kind, n, &y);
            assert_logically_equal(&a.transpose(), &dense(&a).transpose())?;
            let fast = a.hadamard(&b).unwrap();
            let slow = dense(&a).hadamard(&dense(&b)).unwrap();
            assert_logically_equal(&fast, &slow)?;
        }
    }
}
