use async_trait::async_trait;
use chrono::{Days, Utc};
use tracing::debug;
use tripsync_application::{
    ActivityGenerator, GenerationError, ItineraryGenerator, ItineraryRequest, ResearchRequest,
};
use tripsync_domain::{
    Activity, ActivityCatalog, DayPlan, Itinerary, ItineraryItem, TimeSlot,
};

/// (category, templates); `{}` is replaced by the destination
const TEMPLATES: &[(&str, &[&str])] = &[
    ("Food", &["Street food crawl in {}", "Market tasting tour of {}", "Cooking class in {}"]),
    ("Culture", &["Old town walking tour of {}", "Museum afternoon in {}", "Local history talk in {}"]),
    ("Nature", &["Scenic hike near {}", "Botanical garden visit in {}", "Sunset viewpoint over {}"]),
    ("Adventure", &["Kayak trip around {}", "Bike tour through {}", "Climbing session near {}"]),
    ("Relax", &["Spa morning in {}", "Beach or park lounging in {}", "Slow cafe hopping in {}"]),
    ("Nightlife", &["Rooftop bar evening in {}", "Live music night in {}", "Late night food hall in {}"]),
];

/// Builds a catalog from fixed per-category templates.
///
/// Categories named in the request or matching a strong group vibe score
/// higher. Results are ranked by score, then name.
#[derive(Debug, Default, Clone)]
pub struct HeuristicActivityGenerator;

impl HeuristicActivityGenerator {
    pub fn new() -> Self {
        Self
    }

    fn category_boost(category: &str, request: &ResearchRequest) -> f64 {
        let lower = category.to_lowercase();
        let mut boost = 0.0;
        if request
            .preferred_categories
            .iter()
            .any(|c| c.trim().to_lowercase() == lower)
        {
            boost += 0.3;
        }
        if let Some(summary) = &request.preferences
            && let Some(vibe) = summary
                .aggregated_vibes
                .iter()
                .find(|v| v.vibe.to_lowercase() == lower)
        {
            boost += 0.2 * vibe.weight.clamp(0.0, 1.0);
        }
        boost
    }
}

fn slug(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.trim().chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
        } else if !out.ends_with('-') {
            out.push('-');
        }
    }
    out.trim_matches('-').to_string()
}

#[async_trait]
impl ActivityGenerator for HeuristicActivityGenerator {
    async fn research(&self, request: &ResearchRequest) -> Result<ActivityCatalog, GenerationError> {
        let destination = request.destination.trim();
        if destination.is_empty() {
            return Err(GenerationError::InvalidResponse("empty destination".to_string()));
        }
        let prefix = slug(destination);
        let prefix = prefix.as_str();

        let mut activities: Vec<Activity> = TEMPLATES
            .iter()
            .flat_map(|(category, names)| {
                let boost = Self::category_boost(category, request);
                names.iter().enumerate().map(move |(i, template)| {
                    // Earlier templates are the more typical picks
                    let score = 0.5 + boost - 0.05 * i as f64;
                    Activity::new(
                        format!("{}-{}-{}", prefix, category.to_lowercase(), i + 1),
                        template.replace("{}", destination),
                        *category,
                    )
                    .with_base_score(score)
                    .with_description(format!("{} pick for the group", category))
                })
            })
            .collect();

        activities.sort_by(|a, b| {
            b.base_score
                .total_cmp(&a.base_score)
                .then_with(|| a.name.cmp(&b.name))
        });
        activities.truncate(request.max_items);

        debug!(
            trip_id = %request.trip_id,
            destination,
            items = activities.len(),
            "Generated activity catalog"
        );

        Ok(ActivityCatalog {
            destination: destination.to_string(),
            activities,
            generated_at: Utc::now(),
        })
    }
}

/// Lays activities out over the trip days, three slots a day.
///
/// Activities fill slots in the order given; leftover slots become free
/// time and activities that do not fit are dropped.
#[derive(Debug, Default, Clone)]
pub struct HeuristicItineraryGenerator;

impl HeuristicItineraryGenerator {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ItineraryGenerator for HeuristicItineraryGenerator {
    async fn plan(&self, request: &ItineraryRequest) -> Result<Itinerary, GenerationError> {
        if request.duration_days == 0 {
            return Err(GenerationError::InvalidResponse("trip has no days".to_string()));
        }

        let mut pending = request.activities.iter();
        let days = (0..request.duration_days)
            .map(|offset| {
                let items = TimeSlot::ALL
                    .iter()
                    .map(|slot| match pending.next() {
                        Some(activity) => ItineraryItem {
                            slot: *slot,
                            title: activity.name.clone(),
                            activity_id: Some(activity.id.clone()),
                        },
                        None => ItineraryItem {
                            slot: *slot,
                            title: format!("Free time in {}", request.destination),
                            activity_id: None,
                        },
                    })
                    .collect();
                DayPlan {
                    day: offset + 1,
                    date: request
                        .start_date
                        .and_then(|d| d.checked_add_days(Days::new(u64::from(offset)))),
                    items,
                }
            })
            .collect();

        Ok(Itinerary {
            destination: request.destination.clone(),
            start_date: request.start_date,
            days,
        })
    }
}
