/// Compute the Euclidean distance between two embeddings.
///
/// Uses f64 intermediate precision. Returns `f32::INFINITY` on dimension
/// mismatch so a malformed vector can never be the nearest match.
pub fn euclidean_distance(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return f32::INFINITY;
    }

    let mut sum: f64 = 0.0;
    for (&x, &y) in a.iter().zip(b.iter()) {
        let d = x as f64 - y as f64;
        sum += d * d;
    }
    sum.sqrt() as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_is_zero() {
        let v = [0.12, -0.5, 0.33, 0.9];
        assert_eq!(euclidean_distance(&v, &v), 0.0);
    }

    #[test]
    fn three_four_five() {
        let d = euclidean_distance(&[0.0, 0.0], &[3.0, 4.0]);
        assert!((d - 5.0).abs() < 1e-6, "got {d}");
    }

    #[test]
    fn symmetric() {
        let a = [0.1, 0.2, 0.3];
        let b = [0.3, -0.2, 0.1];
        assert_eq!(euclidean_distance(&a, &b), euclidean_distance(&b, &a));
    }

    #[test]
    fn dimension_mismatch_is_infinite() {
        assert_eq!(euclidean_distance(&[1.0, 0.0], &[1.0, 0.0, 0.0]), f32::INFINITY);
    }
}
