//! CPU-bound tasks: primality, factorization, Fibonacci, random numbers.

use anyhow::bail;
use rand::Rng;
use serde_json::{json, Value};

use crate::jobs::{JobHandle, TaskParams};

use super::{parse_i64, parse_u64};

/// `isprime`: trial division up to the square root of `n`.
pub async fn isprime(params: TaskParams, handle: JobHandle) -> anyhow::Result<Value> {
    let n = parse_u64(&params, "n", None)?;
    let prime = is_prime(n, &handle).await;
    handle.set_progress(100).await;
    Ok(json!({ "n": n, "is_prime": prime }))
}

pub async fn is_prime(n: u64, handle: &JobHandle) -> bool {
    if n < 2 {
        return false;
    }
    if n % 2 == 0 {
        return n == 2;
    }
    let limit = integer_sqrt(n);
    let mut divisor = 3;
    let mut iterations: u64 = 0;
    while divisor <= limit {
        if n % divisor == 0 {
            return false;
        }
        divisor += 2;
        iterations += 1;
        if iterations % 100_000 == 0 {
            let progress = (divisor * 100 / limit.max(1)).min(99) as u8;
            handle.set_progress(progress).await;
        }
    }
    true
}

/// `factor`: prime factorization as `[base, exponent]` pairs.
pub async fn factor(params: TaskParams, handle: JobHandle) -> anyhow::Result<Value> {
    let n = parse_u64(&params, "n", None)?;
    if n < 2 {
        bail!("parameter 'n' must be >= 2");
    }

    let mut factors: Vec<(u64, u32)> = Vec::new();
    let mut rest = n;
    let mut divisor = 2;
    while divisor * divisor <= rest {
        if rest % divisor == 0 {
            let mut exponent = 0;
            while rest % divisor == 0 {
                rest /= divisor;
                exponent += 1;
            }
            factors.push((divisor, exponent));
        }
        divisor += if divisor == 2 { 1 } else { 2 };
    }
    if rest > 1 {
        factors.push((rest, 1));
    }

    handle.set_progress(100).await;
    let pairs: Vec<Value> = factors.iter().map(|(p, e)| json!([p, e])).collect();
    Ok(json!({ "n": n, "factors": pairs }))
}

/// `fibonacci`: iterative; `n` is capped where u128 overflows.
pub async fn fibonacci(params: TaskParams, handle: JobHandle) -> anyhow::Result<Value> {
    let n = parse_u64(&params, "n", None)?;
    if n > 186 {
        bail!("parameter 'n' must be <= 186");
    }

    let mut pair: (u128, u128) = (0, 1);
    for _ in 0..n {
        pair = (pair.1, pair.0 + pair.1);
    }

    handle.set_progress(100).await;
    Ok(json!({ "n": n, "result": pair.0.to_string() }))
}

/// `random`: `count` uniform integers in `[min, max]`.
pub async fn random(params: TaskParams, handle: JobHandle) -> anyhow::Result<Value> {
    let count = parse_u64(&params, "count", Some(1))?.min(10_000);
    let min = parse_i64(&params, "min", 0)?;
    let max = parse_i64(&params, "max", 100)?;
    if min > max {
        bail!("parameter 'min' must be <= 'max'");
    }

    let numbers: Vec<i64> = {
        let mut rng = rand::thread_rng();
        (0..count).map(|_| rng.gen_range(min..=max)).collect()
    };

    handle.set_progress(100).await;
    Ok(json!({ "count": count, "min": min, "max": max, "numbers": numbers }))
}

fn integer_sqrt(n: u64) -> u64 {
    let mut root = (n as f64).sqrt() as u64;
    while root.saturating_mul(root) > n {
        root -= 1;
    }
    while (root + 1).saturating_mul(root + 1) <= n {
        root += 1;
    }
    root
}
