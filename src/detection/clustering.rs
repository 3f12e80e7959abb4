use crate::detection::BoundingBox;

/// Turns raw person boxes into a crowd count by density-clustering their
/// horizontal centres (1-D DBSCAN, noise excluded).
///
/// With fewer centres than `min_cluster_size` every box counts as one person.
pub fn count_people(boxes: &[BoundingBox], eps: f32, min_cluster_size: usize) -> u32 {
    if boxes.is_empty() {
        return 0;
    }
    let mut centers: Vec<f32> = boxes.iter().map(BoundingBox::center_x).collect();
    if centers.len() < min_cluster_size {
        return centers.len() as u32;
    }
    centers.sort_by(|a, b| a.total_cmp(b));

    // A core point has at least `min_cluster_size` points (itself included)
    // within `eps`. In sorted 1-D data that window is contiguous.
    let mut cores = Vec::new();
    let mut lo = 0;
    let mut hi = 0;
    for (i, &c) in centers.iter().enumerate() {
        while centers[lo] < c - eps {
            lo += 1;
        }
        if hi < i {
            hi = i;
        }
        while hi + 1 < centers.len() && centers[hi + 1] <= c + eps {
            hi += 1;
        }
        if hi - lo + 1 >= min_cluster_size {
            cores.push(c);
        }
    }

    // Clusters grow only through core points; border points never bridge two.
    let mut clusters = 0;
    let mut previous: Option<f32> = None;
    for core in cores {
        match previous {
            Some(p) if core - p <= eps => {}
            _ => clusters += 1,
        }
        previous = Some(core);
    }
    clusters
}
