//! Correlation and ranking over city statistics.

use super::models::CityStat;
use serde::Serialize;

/// Labels of the correlation matrix axes, in order.
pub const MATRIX_LABELS: [&str; 2] = ["number_of_users", "number_of_purchases"];

/// Pearson correlation coefficient of two equally long series.
///
/// Returns `None` for fewer than two points or when either series is
/// constant.
pub fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    let n = xs.len().min(ys.len());
    if n < 2 {
        return None;
    }
    let (xs, ys) = (&xs[..n], &ys[..n]);
    let mean_x = xs.iter().sum::<f64>() / n as f64;
    let mean_y = ys.iter().sum::<f64>() / n as f64;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (x, y) in xs.iter().zip(ys) {
        let dx = x - mean_x;
        let dy = y - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    if var_x == 0.0 || var_y == 0.0 {
        return None;
    }
    Some((cov / (var_x.sqrt() * var_y.sqrt())).clamp(-1.0, 1.0))
}

/// 2x2 correlation matrix of users and purchases.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct CorrelationMatrix {
    pub values: [[Option<f64>; 2]; 2],
}

impl CorrelationMatrix {
    pub fn for_cities(cities: &[CityStat]) -> Self {
        let users: Vec<f64> = cities.iter().map(|c| c.number_of_users as f64).collect();
        let purchases: Vec<f64> = cities
            .iter()
            .map(|c| c.number_of_purchases as f64)
            .collect();

        let diagonal = |series: &[f64]| pearson(series, series);
        let off = pearson(&users, &purchases);
        Self {
            values: [[diagonal(&users), off], [off, diagonal(&purchases)]],
        }
    }

    /// The off-diagonal users/purchases coefficient.
    pub fn coefficient(&self) -> Option<f64> {
        self.values[0][1]
    }
}

/// The `n` cities with the most users, ties keeping their input order.
pub fn top_cities(cities: &[CityStat], n: usize) -> Vec<CityStat> {
    let mut ranked = cities.to_vec();
    ranked.sort_by(|a, b| b.number_of_users.cmp(&a.number_of_users));
    ranked.truncate(n);
    ranked
}

/// Formats a coefficient with two decimals, or `n/a` when undefined.
pub fn format_coefficient(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{v:.2}"),
        None => "n/a".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn city(name: &str, users: u64, purchases: u64) -> CityStat {
        CityStat {
            city: name.to_string(),
            number_of_users: users,
            number_of_purchases: purchases,
        }
    }

    fn approx(a: Option<f64>, b: f64) -> bool {
        a.is_some_and(|a| (a - b).abs() < 1e-9)
    }

    #[test]
    fn test_pearson_perfect_positive() {
        assert!(approx(pearson(&[1.0, 2.0, 3.0], &[2.0, 4.0, 6.0]), 1.0));
    }

    #[test]
    fn test_pearson_perfect_negative() {
        assert!(approx(pearson(&[1.0, 2.0, 3.0], &[3.0, 2.0, 1.0]), -1.0));
    }

    #[test]
    fn test_pearson_known_value() {
        let r = pearson(&[1.0, 2.0, 3.0], &[1.0, 1.0, 5.0]);
        assert!(approx(r, 3.0f64.sqrt() / 2.0));
    }

    #[test]
    fn test_pearson_undefined_cases() {
        assert_eq!(pearson(&[], &[]), None);
        assert_eq!(pearson(&[1.0], &[2.0]), None);
        assert_eq!(pearson(&[1.0, 1.0, 1.0], &[1.0, 2.0, 3.0]), None);
    }

    #[test]
    fn test_matrix_for_cities() {
        let matrix = CorrelationMatrix::for_cities(&[
            city("A", 10, 5),
            city("B", 20, 10),
            city("C", 30, 15),
        ]);
        assert!(approx(matrix.values[0][0], 1.0));
        assert!(approx(matrix.values[1][1], 1.0));
        assert!(approx(matrix.coefficient(), 1.0));
        assert_eq!(matrix.values[0][1], matrix.values[1][0]);
    }

    #[test]
    fn test_matrix_single_city_is_undefined() {
        let matrix = CorrelationMatrix::for_cities(&[city("A", 3, 1)]);
        assert_eq!(matrix, CorrelationMatrix::default());
        assert_eq!(format_coefficient(matrix.coefficient()), "n/a");
    }

    #[test]
    fn test_top_cities_stable() {
        let cities = vec![city("A", 1, 0), city("B", 5, 0), city("C", 5, 1), city("D", 3, 0)];
        let top = top_cities(&cities, 3);
        let names: Vec<&str> = top.iter().map(|c| c.city.as_str()).collect();
        assert_eq!(names, vec!["B", "C", "D"]);
    }

    #[test]
    fn test_format_coefficient() {
        assert_eq!(format_coefficient(Some(0.8660254)), "0.87");
        assert_eq!(format_coefficient(Some(-1.0)), "-1.00");
    }
}
