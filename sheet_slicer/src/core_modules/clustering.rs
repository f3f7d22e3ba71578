// THEORY:
// Plain k-means over CIE Lab colours, used to summarise the background colours
// sampled from a crop's border. Sample counts are small (a few thousand border
// pixels) and `k` is at most six, so the straightforward Lloyd iteration is
// plenty.
//
// Determinism matters more than speed here: the same crop must always produce
// the same background model. Seeding is therefore farthest-point, starting from
// the middle sample, with no randomness at all.

use crate::core_modules::pixel::pixel::LabColor;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cluster {
    pub center: LabColor,
    pub population: usize,
}

/// Clusters `samples` into at most `k` groups. Empty clusters are dropped and
/// the result is ordered by descending population.
pub fn kmeans(samples: &[LabColor], k: usize, iterations: usize) -> Vec<Cluster> {
    if samples.is_empty() || k == 0 {
        return Vec::new();
    }

    let mut centers = seed_centers(samples, k);
    let mut assignment = vec![0usize; samples.len()];

    for _ in 0..iterations.max(1) {
        let mut changed = false;
        for (slot, sample) in assignment.iter_mut().zip(samples) {
            let nearest = nearest_center(&centers, sample);
            if *slot != nearest {
                *slot = nearest;
                changed = true;
            }
        }

        let mut sums = vec![(0.0f64, 0.0f64, 0.0f64, 0usize); centers.len()];
        for (&cluster, sample) in assignment.iter().zip(samples) {
            let entry = &mut sums[cluster];
            entry.0 += sample.l as f64;
            entry.1 += sample.a as f64;
            entry.2 += sample.b as f64;
            entry.3 += 1;
        }
        for (center, (l, a, b, n)) in centers.iter_mut().zip(&sums) {
            if *n > 0 {
                let n = *n as f64;
                *center = LabColor::new((l / n) as f32, (a / n) as f32, (b / n) as f32);
            }
        }

        if !changed {
            break;
        }
    }

    let mut populations = vec![0usize; centers.len()];
    for (slot, sample) in assignment.iter_mut().zip(samples) {
        *slot = nearest_center(&centers, sample);
        populations[*slot] += 1;
    }

    let mut clusters: Vec<Cluster> = centers
        .into_iter()
        .zip(populations)
        .filter(|(_, population)| *population > 0)
        .map(|(center, population)| Cluster { center, population })
        .collect();
    clusters.sort_by(|a, b| b.population.cmp(&a.population));
    clusters
}

/// Farthest-point seeding from the middle sample. Stops early once every
/// remaining sample coincides with a chosen centre.
fn seed_centers(samples: &[LabColor], k: usize) -> Vec<LabColor> {
    let mut centers = vec![samples[samples.len() / 2]];
    let mut nearest: Vec<f32> = samples.iter().map(|s| s.distance_sq(&centers[0])).collect();

    while centers.len() < k {
        let Some((index, &distance)) = nearest
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
        else {
            break;
        };
        if distance <= 0.0 {
            break;
        }
        let center = samples[index];
        centers.push(center);
        for (d, sample) in nearest.iter_mut().zip(samples) {
            *d = d.min(sample.distance_sq(&center));
        }
    }
    centers
}

fn nearest_center(centers: &[LabColor], sample: &LabColor) -> usize {
    centers
        .iter()
        .enumerate()
        .min_by(|a, b| a.1.distance_sq(sample).total_cmp(&b.1.distance_sq(sample)))
        .map(|(i, _)| i)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lab(l: f32) -> LabColor {
        LabColor::new(l, 0.0, 0.0)
    }

    #[test]
    fn separates_two_groups_ordered_by_population() {
        let mut samples = vec![lab(10.0); 30];
        samples.extend(vec![lab(80.0); 70]);
        samples.push(lab(11.0));

        let clusters = kmeans(&samples, 2, 10);
        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters[0].population, 70);
        assert!((clusters[0].center.l - 80.0).abs() < 1e-3);
        assert_eq!(clusters[1].population, 31);
        assert!((clusters[1].center.l - 10.0).abs() < 0.1);
    }

    #[test]
    fn identical_samples_collapse_to_one_cluster() {
        let samples = vec![lab(42.0); 50];
        let clusters = kmeans(&samples, 6, 10);
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].population, 50);
    }

    #[test]
    fn is_deterministic() {
        let samples: Vec<LabColor> = (0..200)
            .map(|i| LabColor::new((i % 7) as f32 * 13.0, (i % 3) as f32 * 20.0, (i % 5) as f32))
            .collect();
        assert_eq!(kmeans(&samples, 4, 12), kmeans(&samples, 4, 12));
    }

    #[test]
    fn empty_input_gives_no_clusters() {
        assert!(kmeans(&[], 3, 5).is_empty());
        assert!(kmeans(&[lab(1.0)], 0, 5).is_empty());
    }
}
