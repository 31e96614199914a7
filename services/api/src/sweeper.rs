//! Background auto-complete sweep
//!
//! Runs on a fixed cron interval, independent of request handling, and
//! completes matched rides whose departure time has passed. Open rides are
//! deliberately not touched: the legacy behavior of completing
//! never-matched rides conflicted with the MATCHED-only precondition of
//! manual completion and is not reproduced here.

use serde_json::json;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info};

use crate::error::ApiResult;
use crate::notifier::{Audience, EventKind, Notifier};
use crate::repositories::ride::RideRepository;

/// Periodic job completing overdue matched rides
#[derive(Clone)]
pub struct RideSweeper {
    rides: RideRepository,
    notifier: Notifier,
}

impl RideSweeper {
    /// Create a new ride sweeper
    pub fn new(rides: RideRepository, notifier: Notifier) -> Self {
        Self { rides, notifier }
    }

    /// Run one sweep pass, returning the number of rides completed.
    pub async fn sweep_once(&self) -> ApiResult<usize> {
        let completed = self.rides.complete_overdue().await?;

        for ride in &completed {
            let payload = json!({ "ride": ride, "auto_completed": true });
            self.notifier.notify(
                EventKind::RideCompleted,
                Audience::User(ride.rider_id),
                &payload,
            );
            if let Some(passenger_id) = ride.passenger_id {
                self.notifier.notify(
                    EventKind::RideCompleted,
                    Audience::User(passenger_id),
                    &payload,
                );
            }
        }

        Ok(completed.len())
    }

    /// Start the sweep on the given cron schedule.
    ///
    /// The returned scheduler must be kept alive for the job to keep
    /// firing.
    pub async fn start(&self, schedule: &str) -> anyhow::Result<JobScheduler> {
        let sched = JobScheduler::new().await?;

        let sweeper = self.clone();
        let job = Job::new_async(schedule, move |_uuid, _lock| {
            let sweeper = sweeper.clone();
            Box::pin(async move {
                match sweeper.sweep_once().await {
                    Ok(0) => {}
                    Ok(n) => info!("Auto-completed {} overdue ride(s)", n),
                    Err(e) => error!("Ride sweep failed: {}", e),
                }
            })
        })?;

        sched.add(job).await?;
        sched.start().await?;

        info!("Ride sweep scheduled: {}", schedule);
        Ok(sched)
    }
}
