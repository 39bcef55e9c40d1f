//! End-to-end dispatch scenario: a multi-band float32 cube and a float64
//! plane, processed into three outputs of different dimensions and dtypes,
//! compared bit-exactly against direct evaluation of the same kernel.

use coriolis::{ArrayValue, Blockwise, Chunk, DataArray, Dtype, Result};
use ndarray::{ArrayD, IxDyn};
use pretty_assertions::assert_eq;

/// Deterministic pseudo-random values so runs are reproducible.
fn lcg(seed: &mut u64) -> f64 {
    *seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
    ((*seed >> 11) as f64 / (1u64 << 53) as f64) - 0.5
}

fn kernel(args: &[ArrayValue]) -> Result<Vec<ArrayValue>> {
    let x = args[0].as_f32().expect("x is float32").clone();
    let y = args[1].as_f64().expect("y is float64").clone();
    let mask = y.mapv(|v| (v > 0.0) as u8);
    Ok(vec![
        ArrayValue::from(x),
        ArrayValue::from(y),
        ArrayValue::from(mask),
    ])
}

#[test]
fn multi_output_dispatch_matches_direct_call() {
    let mut seed = 42u64;
    let x_values = ArrayD::from_shape_fn(IxDyn(&[5, 200, 200]), |_| lcg(&mut seed) as f32);
    let mut seed = 1234u64;
    let y_values = ArrayD::from_shape_fn(IxDyn(&[200, 200]), |_| lcg(&mut seed));

    let x = DataArray::from_values(
        ArrayValue::from(x_values.clone()),
        &["dim0", "dim1", "dim2"],
        &[Chunk::Full, Chunk::Size(100), Chunk::Size(100)],
    )
    .unwrap();
    let y = DataArray::from_values(
        ArrayValue::from(y_values.clone()),
        &["dim1", "dim2"],
        &[Chunk::Size(100), Chunk::Size(100)],
    )
    .unwrap();

    let blk = Blockwise::new(
        kernel,
        &["dim1", "dim2"],
        &[
            &["dim0", "dim1", "dim2"],
            &["dim1", "dim2"],
            &["dim1", "dim2"],
        ],
        &[Dtype::F32, Dtype::F64, Dtype::U8],
    )
    .unwrap();

    // everything funnels through the largest declared dtype
    assert_eq!(blk.dtype_coerce(), Dtype::F64);

    let results = blk.call(&[&x, &y]).unwrap();
    assert_eq!(results.len(), 3);

    let direct = kernel(&[ArrayValue::from(x_values), ArrayValue::from(y_values)]).unwrap();

    for (i, (got, expected)) in results.iter().zip(&direct).enumerate() {
        let realized = got.compute().unwrap();
        // bit-exact equality, padding and unpadding included
        assert_eq!(realized.to_bytes(), expected.to_bytes(), "output {}", i);
        assert_eq!(realized.dtype(), expected.dtype(), "output {}", i);
    }

    assert_eq!(results[0].dims(), &["dim0", "dim1", "dim2"]);
    assert_eq!(results[0].shape(), &[5, 200, 200]);
    assert_eq!(results[1].dims(), &["dim1", "dim2"]);
    assert_eq!(results[2].dtype(), Dtype::U8);
}

#[test]
fn dispatch_output_feeds_a_second_dispatch() {
    let mut seed = 7u64;
    let values = ArrayD::from_shape_fn(IxDyn(&[60, 80]), |_| lcg(&mut seed));
    let input = DataArray::from_values(
        ArrayValue::from(values.clone()),
        &["rows", "columns"],
        &[Chunk::Size(20), Chunk::Size(40)],
    )
    .unwrap();

    let square = Blockwise::new(
        |args: &[ArrayValue]| {
            let a = args[0].as_f64().expect("float64").clone();
            Ok(vec![ArrayValue::from(a.mapv(|v| v * v))])
        },
        &["rows", "columns"],
        &[&["rows", "columns"]],
        &[Dtype::F64],
    )
    .unwrap();

    // outputs keep the blockwise chunking, so they can be dispatched again
    let squared = square.call1(&[&input]).unwrap();
    let fourth = square.call1(&[&squared]).unwrap();

    let expected = values.mapv(|v| v.powi(4));
    let got = fourth.compute().unwrap();
    let arr = got.as_f64().unwrap();
    for (a, b) in arr.iter().zip(expected.iter()) {
        assert_eq!(a, b);
    }
}
