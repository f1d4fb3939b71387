//! Marker clustering and cluster preview content
//!
//! [`cluster_markers`] groups markers that would overlap on screen at a given
//! zoom level. [`ClusterPresenter`] turns one such group into an icon size
//! tier and the short preview shown when hovering it. Both are pure functions
//! of their input.

use crate::config::PreviewLimits;
use crate::geo_math::{self, Coordinate};
use crate::{Marker, utils};
use smallvec::SmallVec;
use std::collections::HashMap;

/// Label used for markers with no profession when grouping by category
const UNCATEGORIZED: &str = "Other";

/// Icon size tier of a cluster
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SizeTier {
    Small,
    Medium,
    Large,
    ExtraLarge,
}

impl SizeTier {
    /// `<5`, `<20`, `<50`, `>=50`
    pub fn for_count(count: usize) -> Self {
        match count {
            0..5 => Self::Small,
            5..20 => Self::Medium,
            20..50 => Self::Large,
            _ => Self::ExtraLarge,
        }
    }

    /// Icon edge length in pixels
    pub fn icon_px(self) -> u32 {
        match self {
            Self::Small => 30,
            Self::Medium => 40,
            Self::Large => 50,
            Self::ExtraLarge => 60,
        }
    }

    /// CSS-style class name for the icon
    pub fn class_name(self) -> &'static str {
        match self {
            Self::Small => "cluster-small",
            Self::Medium => "cluster-medium",
            Self::Large => "cluster-large",
            Self::ExtraLarge => "cluster-xlarge",
        }
    }
}

/// What the preview lists
#[derive(Debug, Clone, PartialEq)]
pub enum PreviewBody {
    Empty,
    /// Member titles; `more` counts members not listed
    Titles {
        titles: SmallVec<[String; 5]>,
        more: usize,
    },
    /// Top categories by member count; `more` counts categories not listed
    Categories {
        categories: SmallVec<[(String, usize); 4]>,
        more: usize,
    },
}

/// Tier and preview content for one cluster
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterPreview {
    pub tier: SizeTier,
    pub count: usize,
    pub body: PreviewBody,
}

impl ClusterPreview {
    pub fn empty() -> Self {
        Self {
            tier: SizeTier::Small,
            count: 0,
            body: PreviewBody::Empty,
        }
    }

    /// Preview as display lines, including the "+N more" trailer
    pub fn lines(&self) -> Vec<String> {
        match &self.body {
            PreviewBody::Empty => Vec::new(),
            PreviewBody::Titles { titles, more } => {
                let mut lines: Vec<String> = titles.iter().cloned().collect();
                if *more > 0 {
                    lines.push(format!("+{more} more"));
                }
                lines
            }
            PreviewBody::Categories { categories, more } => {
                let mut lines: Vec<String> = categories
                    .iter()
                    .map(|(name, count)| format!("{name} ({count})"))
                    .collect();
                if *more > 0 {
                    lines.push(format!("+{more} more categories"));
                }
                lines
            }
        }
    }
}

/// Builds previews for clusters
#[derive(Debug, Clone, Default)]
pub struct ClusterPresenter {
    limits: PreviewLimits,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl ClusterPresenter {
    pub fn new(limits: PreviewLimits) -> Self {
        Self { limits }
    }

    /// Tier and preview for the members of one cluster
    pub fn present(&self, members: &[&Marker]) -> ClusterPreview {
        let count = members.len();
        if count == 0 {
            return ClusterPreview::empty();
        }

        let body = if count <= self.limits.title_list_max_members {
            self.title_body(members)
        } else {
            self.category_body(members)
        };

        ClusterPreview {
            tier: SizeTier::for_count(count),
            count,
            body,
        }
    }

    fn title_body(&self, members: &[&Marker]) -> PreviewBody {
        let titles = members
            .iter()
            .take(self.limits.titles)
            .map(|m| truncate_title(&m.title, self.limits.title_chars))
            .collect();
        PreviewBody::Titles {
            titles,
            more: members.len().saturating_sub(self.limits.titles),
        }
    }

    fn category_body(&self, members: &[&Marker]) -> PreviewBody {
        let mut order: Vec<&str> = Vec::new();
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for marker in members {
            let name = match marker.profession.trim() {
                "" => UNCATEGORIZED,
                name => name,
            };
            let count = counts.entry(name).or_insert(0);
            if *count == 0 {
                order.push(name);
            }
            *count += 1;
        }

        let mut ranked: Vec<(&str, usize)> = order
            .into_iter()
            .map(|name| (name, counts[name]))
            .collect();
        // Stable: first-seen order breaks ties
        ranked.sort_by(|a, b| b.1.cmp(&a.1));

        let more = ranked.len().saturating_sub(self.limits.categories);
        let categories = ranked
            .into_iter()
            .take(self.limits.categories)
            .map(|(name, count)| (name.to_string(), count))
            .collect();
        PreviewBody::Categories { categories, more }
    }
}

/// Shorten a title to `budget` characters, ending with an ellipsis when cut
pub fn truncate_title(title: &str, budget: usize) -> String {
    if title.chars().count() <= budget {
        return title.to_string();
    }
    let mut shortened: String = title.chars().take(budget.saturating_sub(1)).collect();
    shortened.push('…');
    shortened
}

/// A group of markers drawn as a single icon
#[derive(Debug, Clone)]
pub struct Cluster<'a> {
    /// Mean position of the members
    pub center: Coordinate,
    pub members: Vec<&'a Marker>,
}

impl Cluster<'_> {
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Group located markers into screen-space grid cells of `cell_px` pixels
///
/// Clusters come out in the order their first member appears in the input;
/// members keep input order. Markers without coordinates are left out.
pub fn cluster_markers<'a, I>(markers: I, zoom: u8, cell_px: f64) -> Vec<Cluster<'a>>
where
    I: IntoIterator<Item = &'a Marker>,
{
    #[cfg(feature = "profiling")]
    profiling::scope!("cluster::cluster_markers");

    let cell_m = utils::meters_per_pixel(zoom) * cell_px.max(1.0);

    let mut slots: HashMap<(i64, i64), usize> = HashMap::new();
    let mut groups: Vec<Vec<&'a Marker>> = Vec::new();
    for marker in markers {
        let Some(position) = marker.coordinate() else {
            continue;
        };
        let point = utils::wgs84_to_mercator(position.lat, position.lon);
        let cell = (
            ((point.x() - utils::EARTH_MERCATOR_MIN) / cell_m).floor() as i64,
            ((utils::EARTH_MERCATOR_MAX - point.y()) / cell_m).floor() as i64,
        );
        let slot = *slots.entry(cell).or_insert_with(|| {
            groups.push(Vec::new());
            groups.len() - 1
        });
        groups[slot].push(marker);
    }

    groups
        .into_iter()
        .filter_map(|members| {
            let center = geo_math::centroid(members.iter().filter_map(|m| m.coordinate()))?;
            Some(Cluster { center, members })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn markers(count: usize) -> Vec<Marker> {
        (0..count)
            .map(|i| {
                let profession = match i % 7 {
                    0 | 1 | 2 => "Writer",
                    3 | 4 => "Painter",
                    5 => "Scientist",
                    _ => "",
                };
                Marker::new(i as u64, format!("Marker {i}"))
                    .with_profession(profession)
                    .with_position(51.5 + i as f64 * 1e-5, -0.12)
            })
            .collect()
    }

    #[test]
    fn test_size_tiers() {
        assert_eq!(SizeTier::for_count(1), SizeTier::Small);
        assert_eq!(SizeTier::for_count(4), SizeTier::Small);
        assert_eq!(SizeTier::for_count(5), SizeTier::Medium);
        assert_eq!(SizeTier::for_count(19), SizeTier::Medium);
        assert_eq!(SizeTier::for_count(20), SizeTier::Large);
        assert_eq!(SizeTier::for_count(49), SizeTier::Large);
        assert_eq!(SizeTier::for_count(50), SizeTier::ExtraLarge);
        assert!(SizeTier::Small.icon_px() < SizeTier::ExtraLarge.icon_px());
    }

    #[test]
    fn test_small_cluster_lists_all_titles() {
        let markers = markers(3);
        let members: Vec<&Marker> = markers.iter().collect();
        let preview = ClusterPresenter::default().present(&members);

        assert_eq!(preview.tier, SizeTier::Small);
        assert_eq!(preview.lines(), vec!["Marker 0", "Marker 1", "Marker 2"]);
    }

    #[test]
    fn test_medium_cluster_lists_five_and_more_line() {
        let markers = markers(12);
        let members: Vec<&Marker> = markers.iter().collect();
        let preview = ClusterPresenter::default().present(&members);

        assert_eq!(preview.tier, SizeTier::Medium);
        let lines = preview.lines();
        assert_eq!(lines.len(), 6);
        assert_eq!(lines[5], "+7 more");
    }

    #[test]
    fn test_fifty_members_still_list_titles() {
        let markers = markers(50);
        let members: Vec<&Marker> = markers.iter().collect();
        let preview = ClusterPresenter::default().present(&members);
        assert_eq!(preview.tier, SizeTier::ExtraLarge);
        assert!(matches!(preview.body, PreviewBody::Titles { more: 45, .. }));
    }

    #[test]
    fn test_large_cluster_groups_by_category() {
        let markers = markers(60);
        let members: Vec<&Marker> = markers.iter().collect();
        let preview = ClusterPresenter::default().present(&members);

        assert_eq!(preview.tier, SizeTier::ExtraLarge);
        let PreviewBody::Categories { categories, more } = &preview.body else {
            panic!("expected a category preview, got {:?}", preview.body);
        };
        // 60 markers: Writer 27, Painter 17, Scientist 8, Other 8
        assert_eq!(categories[0], ("Writer".to_string(), 27));
        assert_eq!(categories[1], ("Painter".to_string(), 17));
        assert_eq!(categories[3], ("Other".to_string(), 8));
        assert_eq!(categories.len(), 4);
        assert_eq!(*more, 0);
        assert_eq!(preview.lines()[0], "Writer (27)");
    }

    #[test]
    fn test_category_overflow_line() {
        let markers: Vec<Marker> = (0..60)
            .map(|i| Marker::new(i, "M").with_profession(format!("Job {}", i % 6)))
            .collect();
        let members: Vec<&Marker> = markers.iter().collect();
        let preview = ClusterPresenter::default().present(&members);
        let lines = preview.lines();
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[4], "+2 more categories");
    }

    #[test]
    fn test_empty_cluster_preview() {
        let preview = ClusterPresenter::default().present(&[]);
        assert_eq!(preview, ClusterPreview::empty());
        assert!(preview.lines().is_empty());
    }

    #[test]
    fn test_truncate_title() {
        assert_eq!(truncate_title("Short", 10), "Short");
        assert_eq!(truncate_title("Exactly ten", 11), "Exactly ten");
        let cut = truncate_title("Isambard Kingdom Brunel", 10);
        assert_eq!(cut.chars().count(), 10);
        assert!(cut.ends_with('…'));
    }

    #[test]
    fn test_cluster_markers_groups_close_points() {
        let markers = vec![
            Marker::new(1, "A").with_position(51.5000, -0.1200),
            Marker::new(2, "B").with_position(51.5001, -0.1201),
            Marker::new(3, "Far").with_position(51.6000, -0.3000),
            Marker::new(4, "No position"),
        ];
        let clusters = cluster_markers(&markers, 12, 60.0);
        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters[0].len(), 2);
        assert_eq!(clusters[1].members[0].id, 3);
        assert!((clusters[0].center.lat - 51.50005).abs() < 1e-9);
    }

    #[test]
    fn test_high_zoom_separates_points() {
        let markers = vec![
            Marker::new(1, "A").with_position(51.5000, -0.1200),
            Marker::new(2, "B").with_position(51.5010, -0.1210),
        ];
        assert_eq!(cluster_markers(&markers, 10, 60.0).len(), 1);
        assert_eq!(cluster_markers(&markers, 19, 60.0).len(), 2);
    }
}
