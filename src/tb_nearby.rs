// Nearby-station search: haversine distances bucketed into walking bands
use crate::tb_models::Station;
use geo::{Distance, Haversine, Point};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DistanceBand {
    VeryClose,
    Close,
    Walkable,
    Farther,
}

impl DistanceBand {
    pub fn for_distance(metres: f64) -> Self {
        if metres < 250.0 {
            DistanceBand::VeryClose
        } else if metres < 500.0 {
            DistanceBand::Close
        } else if metres < 1000.0 {
            DistanceBand::Walkable
        } else {
            DistanceBand::Farther
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DistanceBand::VeryClose => "Under 250 m",
            DistanceBand::Close => "250 - 500 m",
            DistanceBand::Walkable => "500 m - 1 km",
            DistanceBand::Farther => "Over 1 km",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NearbyStation<'a> {
    pub station: &'a Station,
    pub distance_m: f64,
}

pub fn distance_m(station: &Station, latitude: f64, longitude: f64) -> f64 {
    Haversine.distance(
        Point::new(longitude, latitude),
        Point::new(station.longitude, station.latitude),
    )
}

/// Stations within `radius_m` of the origin, nearest first, grouped by band.
/// Bands with no station are left out.
pub fn group_by_distance(
    stations: &[Station],
    latitude: f64,
    longitude: f64,
    radius_m: f64,
) -> Vec<(DistanceBand, Vec<NearbyStation<'_>>)> {
    let mut nearby: Vec<NearbyStation> = stations
        .iter()
        .map(|station| NearbyStation {
            station,
            distance_m: distance_m(station, latitude, longitude),
        })
        .filter(|n| n.distance_m <= radius_m)
        .collect();

    nearby.sort_by(|a, b| a.distance_m.total_cmp(&b.distance_m));

    let mut groups: Vec<(DistanceBand, Vec<NearbyStation>)> = Vec::new();
    for n in nearby {
        let band = DistanceBand::for_distance(n.distance_m);
        match groups.last_mut() {
            Some((last, members)) if *last == band => members.push(n),
            _ => groups.push((band, vec![n])),
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tb_models::TransitMode;

    const ORIGIN: (f64, f64) = (41.3870, 2.1700);

    fn station(code: &str, lat_offset: f64) -> Station {
        Station {
            code: code.to_string(),
            name: format!("Station {}", code),
            mode: TransitMode::Metro,
            latitude: ORIGIN.0 + lat_offset,
            longitude: ORIGIN.1,
            lines: vec!["L3".to_string()],
            bikes: None,
        }
    }

    fn codes(members: &[NearbyStation]) -> Vec<String> {
        members.iter().map(|n| n.station.code.clone()).collect()
    }

    #[test]
    fn one_thousandth_of_a_degree_of_latitude_is_about_111_metres() {
        let d = distance_m(&station("a", 0.001), ORIGIN.0, ORIGIN.1);
        assert!((d - 111.2).abs() < 1.0, "got {}", d);
    }

    #[test]
    fn stations_are_sorted_and_bucketed() {
        // Roughly 1334 m, 111 m, 667 m, 334 m, 5.5 km and 222 m north of the origin.
        let stations = vec![
            station("far", 0.012),
            station("a", 0.001),
            station("c", 0.006),
            station("b", 0.003),
            station("out", 0.05),
            station("a2", 0.002),
        ];

        let groups = group_by_distance(&stations, ORIGIN.0, ORIGIN.1, 2000.0);
        let bands: Vec<DistanceBand> = groups.iter().map(|(b, _)| *b).collect();
        assert_eq!(
            bands,
            vec![
                DistanceBand::VeryClose,
                DistanceBand::Close,
                DistanceBand::Walkable,
                DistanceBand::Farther
            ]
        );
        assert_eq!(codes(&groups[0].1), vec!["a", "a2"]);
        assert_eq!(codes(&groups[1].1), vec!["b"]);
        assert_eq!(codes(&groups[2].1), vec!["c"]);
        assert_eq!(codes(&groups[3].1), vec!["far"]);
    }

    #[test]
    fn radius_excludes_and_empty_bands_are_skipped() {
        let stations = vec![station("a", 0.001), station("c", 0.006), station("far", 0.012)];

        let groups = group_by_distance(&stations, ORIGIN.0, ORIGIN.1, 1000.0);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].0, DistanceBand::VeryClose);
        assert_eq!(groups[1].0, DistanceBand::Walkable);

        assert!(group_by_distance(&stations, ORIGIN.0, ORIGIN.1, 50.0).is_empty());
    }
}
