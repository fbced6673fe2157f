use std::collections::BTreeMap;

pub const BIRD_SCORE: f64 = 0.25;
pub const OWL_SCORE: f64 = -0.4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ObjectKind {
    Bird,
    Owl,
}

impl ObjectKind {
    /// Score applied per tick while the object is in range.
    pub fn score_delta(self) -> f64 {
        match self {
            ObjectKind::Bird => BIRD_SCORE,
            ObjectKind::Owl => OWL_SCORE,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ObjectKind::Bird => "bird",
            ObjectKind::Owl => "owl",
        }
    }
}

/// Something flying right to left. Position is the center, in world units.
#[derive(Debug, Clone, PartialEq)]
pub struct SpawnedObject {
    pub x: f64,
    pub y: f64,
    pub speed: f64,
    pub kind: ObjectKind,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProximityReport {
    /// Indices into the scanned slice.
    pub nearby: Vec<usize>,
    pub counts: BTreeMap<ObjectKind, usize>,
    pub delta: f64,
}

impl ProximityReport {
    pub fn total(&self) -> usize {
        self.nearby.len()
    }
}

/// Objects whose centers lie within `radius` of `center`, boundary included.
pub fn scan(center: (f64, f64), radius: f64, objects: &[SpawnedObject]) -> ProximityReport {
    let mut report = ProximityReport::default();
    for (i, obj) in objects.iter().enumerate() {
        let distance = (obj.x - center.0).hypot(obj.y - center.1);
        if distance <= radius {
            report.nearby.push(i);
            *report.counts.entry(obj.kind).or_insert(0) += 1;
            report.delta += obj.kind.score_delta();
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(x: f64, y: f64, kind: ObjectKind) -> SpawnedObject {
        SpawnedObject {
            x,
            y,
            speed: 3.0,
            kind,
        }
    }

    #[test]
    fn mixed_flock_nets_out() {
        let objects = [
            at(10.0, 0.0, ObjectKind::Owl),
            at(0.0, 20.0, ObjectKind::Bird),
            at(-30.0, -30.0, ObjectKind::Bird),
            at(400.0, 0.0, ObjectKind::Owl),
        ];
        let report = scan((0.0, 0.0), 85.0, &objects);
        assert_eq!(report.nearby, [0, 1, 2]);
        assert_eq!(report.counts[&ObjectKind::Bird], 2);
        assert_eq!(report.counts[&ObjectKind::Owl], 1);
        assert!((report.delta - 0.10).abs() < 1e-9, "{}", report.delta);
    }

    #[test]
    fn radius_boundary_is_inclusive() {
        let objects = [at(185.0, 50.0, ObjectKind::Bird), at(100.0, -35.0, ObjectKind::Bird)];
        let report = scan((100.0, 50.0), 85.0, &objects);
        assert_eq!(report.total(), 2);

        let objects = [at(185.0 + 1e-9, 50.0, ObjectKind::Bird)];
        assert_eq!(scan((100.0, 50.0), 85.0, &objects).total(), 0);
    }

    #[test]
    fn nothing_nearby_is_empty() {
        let report = scan((0.0, 0.0), 85.0, &[]);
        assert_eq!(report, ProximityReport::default());
    }
}
