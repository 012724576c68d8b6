use async_trait::async_trait;
use chrono::NaiveDate;

use super::models::Slot;
use crate::clients::ClientConfig;

const FIRST_SLOT_HOUR: u32 = 9;
const LAST_SLOT_HOUR: u32 = 17;
const FALLBACK_SERVICE: &str = "General Service";

/// Answers `check_availability`. Swapping in a real scheduler means a new implementation
/// of this trait; the dispatch contract stays the same.
#[async_trait]
pub trait AvailabilityEngine: Send + Sync {
    async fn available_slots(&self, date: NaiveDate, config: &ClientConfig) -> Vec<Slot>;
}

/// Stub engine: hourly slots 09:00..=17:00, all available, for any date.
///
/// Opening hours, booking rules and existing bookings are not consulted.
pub struct FixedSlotAvailability;

#[async_trait]
impl AvailabilityEngine for FixedSlotAvailability {
    async fn available_slots(&self, _date: NaiveDate, config: &ClientConfig) -> Vec<Slot> {
        let service = primary_service(&config.services);
        (FIRST_SLOT_HOUR..=LAST_SLOT_HOUR)
            .map(|hour| Slot {
                time: format!("{hour:02}:00"),
                available: true,
                service: service.clone(),
            })
            .collect()
    }
}

/// First `;`-separated entry of the services list.
pub fn primary_service(services: &str) -> String {
    services
        .split(';')
        .next()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(FALLBACK_SERVICE)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primary_service() {
        assert_eq!(primary_service("Haircut;Color"), "Haircut");
        assert_eq!(primary_service(" Massage ; Facial"), "Massage");
        assert_eq!(primary_service(""), FALLBACK_SERVICE);
        assert_eq!(primary_service(";Color"), FALLBACK_SERVICE);
    }

    #[tokio::test]
    async fn test_fixed_slots_ignore_date() {
        let config = ClientConfig {
            services: "Haircut;Color".to_string(),
            ..Default::default()
        };
        let engine = FixedSlotAvailability;
        let a = engine
            .available_slots(NaiveDate::from_ymd_opt(2025, 9, 12).unwrap(), &config)
            .await;
        let b = engine
            .available_slots(NaiveDate::from_ymd_opt(2025, 12, 25).unwrap(), &config)
            .await;
        assert_eq!(a, b);
        let times: Vec<_> = a.iter().map(|s| s.time.as_str()).collect();
        assert_eq!(
            times,
            ["09:00", "10:00", "11:00", "12:00", "13:00", "14:00", "15:00", "16:00", "17:00"]
        );
    }
}
