// Percentage of sampled pixels inside a color range
use super::geometry::{ColorRange, Rgb};

/// Percentage (0-100, one decimal) of `samples` whose every channel lies in
/// `range`. Callers must short-circuit empty sample sets first.
pub fn match_percent(samples: &[Rgb], range: &ColorRange) -> f64 {
    debug_assert!(!samples.is_empty(), "match_percent called with no samples");

    let in_range = samples.iter().filter(|c| range.contains(**c)).count();
    round_tenth(100.0 * in_range as f64 / samples.len() as f64)
}

pub(crate) fn round_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn grey(v: u8) -> Rgb {
        Rgb::new(v, v, v)
    }

    #[test]
    fn test_all_and_nothing() {
        let samples = vec![grey(10), grey(20), grey(30)];

        assert_eq!(match_percent(&samples, &ColorRange::default()), 100.0);

        let red = ColorRange::new(Rgb::new(200, 0, 0), Rgb::new(255, 50, 50));
        assert_eq!(match_percent(&samples, &red), 0.0);
    }

    #[test]
    fn test_rounds_to_one_decimal() {
        let range = ColorRange::new(grey(0), grey(100));
        let samples = vec![grey(50), grey(200), grey(200)];

        assert_eq!(match_percent(&samples, &range), 33.3);

        let samples = vec![grey(50), grey(50), grey(200)];
        assert_eq!(match_percent(&samples, &range), 66.7);
    }

    #[test]
    fn test_every_channel_must_match() {
        let range = ColorRange::new(Rgb::new(0, 0, 0), Rgb::new(100, 100, 100));
        let samples = vec![Rgb::new(50, 50, 50), Rgb::new(50, 50, 101)];

        assert_eq!(match_percent(&samples, &range), 50.0);
    }

    proptest! {
        #[test]
        fn prop_percent_is_bounded_and_repeatable(
            pixels in prop::collection::vec(any::<[u8; 3]>(), 1..200),
            lo in any::<[u8; 3]>(),
            hi in any::<[u8; 3]>(),
        ) {
            let samples: Vec<Rgb> = pixels.into_iter().map(Rgb).collect();
            let range = ColorRange::new(Rgb(lo), Rgb(hi));

            let first = match_percent(&samples, &range);
            prop_assert!((0.0..=100.0).contains(&first));
            prop_assert_eq!(first, match_percent(&samples, &range));
        }
    }
}
