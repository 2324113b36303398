//! Daily feed assembly
//!
//! One request, no state carried between requests:
//!
//! 1. Local date and time-of-day bucket in the client's timezone
//! 2. Weather (cache, live, or neutral)
//! 3. Photo, greeting and activity: pool → conditioning → rotation →
//!    validity filter → else neutral default
//! 4. Task list with today's acknowledgment state
//!
//! Weather, the three content pools and the task list are fetched
//! concurrently. Each content category gets one configured time budget
//! covering its pool lookup and validity probing; a category that overruns
//! is served its default and the rest of the feed is unaffected. The
//! ledger read behind the task list has the same budget and degrades to
//! "not acknowledged".

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use dayfeed_common::api::{
    AcknowledgeRequest, AcknowledgeResponse, AcknowledgmentEntry, DailyPhoto, FeedResponse,
};
use dayfeed_common::config::FeedConfig;
use dayfeed_common::time::{local_date, millis_to_duration};
use dayfeed_common::{select, Error, Result, RotationPeriod, TimeOfDay, WeatherState};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::content::{condition_pool, pick_valid, Category, ContentItem, ContentPoolResolver, MediaProbe};
use crate::ledger::AcknowledgmentLedger;
use crate::tasks::plan_tasks;
use crate::weather::WeatherService;

pub struct FeedAssembler {
    config: Arc<FeedConfig>,
    resolver: ContentPoolResolver,
    probe: Arc<dyn MediaProbe>,
    weather: Arc<WeatherService>,
    ledger: AcknowledgmentLedger,
    category_timeout: Duration,
}

impl FeedAssembler {
    pub fn new(
        config: Arc<FeedConfig>,
        resolver: ContentPoolResolver,
        probe: Arc<dyn MediaProbe>,
        weather: Arc<WeatherService>,
        ledger: AcknowledgmentLedger,
    ) -> Self {
        let category_timeout = millis_to_duration(config.category_timeout_ms);
        Self {
            config,
            resolver,
            probe,
            weather,
            ledger,
            category_timeout,
        }
    }

    pub fn config(&self) -> &FeedConfig {
        &self.config
    }

    pub fn ledger(&self) -> &AcknowledgmentLedger {
        &self.ledger
    }

    // ========================================
    // Feed
    // ========================================

    pub async fn assemble(&self, client_id: &str) -> Result<FeedResponse> {
        self.assemble_at(client_id, Utc::now()).await
    }

    /// Build the feed as of `now`
    ///
    /// Only an empty `client_id` is an error; every data-source failure
    /// degrades a single field.
    pub async fn assemble_at(&self, client_id: &str, now: DateTime<Utc>) -> Result<FeedResponse> {
        let client_id = client_id.trim();
        if client_id.is_empty() {
            return Err(Error::InvalidInput("clientId is required".to_string()));
        }

        let client = self.config.client(client_id);
        if client.is_none() {
            debug!(client_id = %client_id, "Feed requested for unconfigured client");
        }

        let tz = self.timezone_for(client_id);
        let today = local_date(now, tz);
        let time_of_day = TimeOfDay::at(now, tz);
        let location = client.and_then(|c| c.location.as_deref());

        let neutral = WeatherState::neutral();
        let (
            weather,
            photo,
            (greeting_pool, greeting_budget),
            (activity_pool, activity_budget),
            tasks,
        ) = tokio::join!(
            self.weather.current(location, now, tz),
            async {
                let (pool, budget) = self.pool_for(client_id, Category::Photo).await;
                self.choose(client_id, Category::Photo, pool, budget, today, &neutral, time_of_day)
                    .await
            },
            self.pool_for(client_id, Category::Greeting),
            self.pool_for(client_id, Category::Activity),
            plan_tasks(client, today, time_of_day, &self.ledger, self.category_timeout),
        );

        // Greeting and activity wait for weather; that wait is not charged
        // to their budgets
        let (greeting, activity) = tokio::join!(
            self.choose(
                client_id,
                Category::Greeting,
                greeting_pool,
                greeting_budget,
                today,
                &weather.state,
                time_of_day
            ),
            self.choose(
                client_id,
                Category::Activity,
                activity_pool,
                activity_budget,
                today,
                &weather.state,
                time_of_day
            ),
        );

        let defaults = &self.config.defaults;

        let daily_photo = match &photo {
            Some(item) => DailyPhoto {
                url: item.payload.clone(),
                caption: item.caption.clone(),
            },
            None => DailyPhoto {
                url: String::new(),
                caption: defaults.photo_caption.clone(),
            },
        };

        let greeting_text = greeting
            .as_ref()
            .map(|item| item.payload.clone())
            .unwrap_or_else(|| defaults.greeting.clone());

        let activity_text = activity
            .as_ref()
            .map(|item| item.payload.clone())
            .unwrap_or_else(|| {
                if weather.state.is_good_for_outdoor {
                    defaults.activity_outdoor.clone()
                } else {
                    defaults.activity_indoor.clone()
                }
            });

        info!(
            client_id = %client_id,
            time_of_day = %time_of_day,
            photo_tier = tier_name(&photo),
            greeting_tier = tier_name(&greeting),
            activity_tier = tier_name(&activity),
            weather = ?weather.report.source,
            tasks = tasks.len(),
            "Feed assembled"
        );

        Ok(FeedResponse {
            client_id: client_id.to_string(),
            tasks,
            daily_photo,
            weather: weather.report,
            greeting: greeting_text,
            activity: activity_text,
            time_of_day,
            timestamp: now,
        })
    }

    /// Pool for one category and what is left of its time budget
    ///
    /// The pool is empty if the stores overran the budget.
    async fn pool_for(&self, client_id: &str, category: Category) -> (Vec<ContentItem>, Duration) {
        let deadline = Instant::now() + self.category_timeout;
        let pool = match tokio::time::timeout_at(deadline, self.resolver.resolve(client_id, category))
            .await
        {
            Ok(pool) => pool,
            Err(_) => {
                warn!(
                    client_id = %client_id,
                    category = %category,
                    timeout_ms = self.category_timeout.as_millis() as u64,
                    "Content pool lookup timed out"
                );
                Vec::new()
            }
        };
        (pool, deadline.saturating_duration_since(Instant::now()))
    }

    /// Rotation pick for one category, or `None` for the default
    ///
    /// Validity probing gets whatever `budget` the pool lookup left over.
    #[allow(clippy::too_many_arguments)]
    async fn choose(
        &self,
        client_id: &str,
        category: Category,
        pool: Vec<ContentItem>,
        budget: Duration,
        date: NaiveDate,
        weather: &WeatherState,
        time_of_day: TimeOfDay,
    ) -> Option<ContentItem> {
        let pool = condition_pool(pool, category, weather, time_of_day);
        if pool.is_empty() {
            return None;
        }

        let seed = self.period_for(category).seed(client_id, date);
        let start = select(&seed, pool.len()).ok()?;
        debug!(category = %category, seed = %seed, start, pool_size = pool.len(), "Rotation index");

        match tokio::time::timeout(budget, pick_valid(&pool, start, self.probe.as_ref())).await {
            Ok(item) => item.cloned(),
            Err(_) => {
                warn!(
                    client_id = %client_id,
                    category = %category,
                    timeout_ms = self.category_timeout.as_millis() as u64,
                    "Category budget exhausted during validity probing"
                );
                None
            }
        }
    }

    fn period_for(&self, category: Category) -> RotationPeriod {
        let rotation = &self.config.rotation;
        match category {
            Category::Photo => rotation.photo,
            Category::Greeting => rotation.greeting,
            Category::Activity => rotation.activity,
        }
    }

    fn timezone_for(&self, client_id: &str) -> Tz {
        self.config.timezone_for(client_id).unwrap_or_else(|e| {
            warn!(client_id = %client_id, "Falling back to UTC: {}", e);
            Tz::UTC
        })
    }

    // ========================================
    // Acknowledgments
    // ========================================

    pub async fn acknowledge(&self, request: &AcknowledgeRequest) -> Result<AcknowledgeResponse> {
        self.acknowledge_at(request, Utc::now()).await
    }

    /// Confirm a task as of `now`
    ///
    /// The day is the client's local date at `now` on the server clock.
    /// Slot names are normalized to their wire label so "Morning" and
    /// "Aamu" confirm the same reminder; unknown slot names are kept as-is.
    pub async fn acknowledge_at(
        &self,
        request: &AcknowledgeRequest,
        now: DateTime<Utc>,
    ) -> Result<AcknowledgeResponse> {
        let client_id = request.client_id.trim();
        let task_type = request.task_type.trim();
        let description = request.description.trim();
        let raw_slot = request.time_slot.trim();

        for (field, value) in [
            ("clientId", client_id),
            ("taskType", task_type),
            ("timeSlot", raw_slot),
            ("description", description),
        ] {
            if value.is_empty() {
                return Err(Error::InvalidInput(format!("{} is required", field)));
            }
        }

        let time_slot = raw_slot
            .parse::<TimeOfDay>()
            .map(|slot| slot.label().to_string())
            .unwrap_or_else(|_| raw_slot.to_string());

        let today = local_date(now, self.timezone_for(client_id));
        let already_acked = self
            .ledger
            .acknowledge(today, task_type, &time_slot, description, client_id, now)
            .await?;

        Ok(AcknowledgeResponse::ok(already_acked))
    }

    /// Recorded acknowledgments for a client on `date` (default: today)
    pub async fn acknowledgments(
        &self,
        client_id: &str,
        date: Option<NaiveDate>,
    ) -> Result<Vec<AcknowledgmentEntry>> {
        let client_id = client_id.trim();
        if client_id.is_empty() {
            return Err(Error::InvalidInput("clientId is required".to_string()));
        }
        let date = date.unwrap_or_else(|| local_date(Utc::now(), self.timezone_for(client_id)));
        self.ledger.acks_for_date(date, Some(client_id)).await
    }
}

fn tier_name(item: &Option<ContentItem>) -> &'static str {
    item.as_ref()
        .map(|i| i.source_tier.as_str())
        .unwrap_or("default")
}
