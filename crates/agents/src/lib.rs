use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use safepoint_core::{classify, AssistError, AssistQuery, AssistReply, Intent, ReplyContext};
use safepoint_lookup::{PlaceSearch, RoutePlanning};
use safepoint_observability::AppMetrics;
use safepoint_storage::QuotaStore;
use safepoint_synth::{ComposedReply, ReplyComposer, NO_NEARBY_RESULTS_REPLY};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

/// The query orchestrator. Providers are `Option` because their
/// credentials come from process configuration; a missing provider is a
/// per-request configuration fault, not a startup panic.
#[derive(Clone)]
pub struct AssistAgent<L, R, G> {
    locator: Option<L>,
    planner: Option<R>,
    synthesizer: Option<G>,
    quotas: QuotaStore,
    metrics: Arc<AppMetrics>,
}

impl<L, R, G> AssistAgent<L, R, G>
where
    L: PlaceSearch,
    R: RoutePlanning,
    G: ReplyComposer,
{
    pub fn new(
        locator: Option<L>,
        planner: Option<R>,
        synthesizer: Option<G>,
        quotas: QuotaStore,
        metrics: Arc<AppMetrics>,
    ) -> Self {
        Self {
            locator,
            planner,
            synthesizer,
            quotas,
            metrics,
        }
    }

    pub fn fully_configured(&self) -> bool {
        self.locator.is_some() && self.planner.is_some() && self.synthesizer.is_some()
    }

    pub fn quotas(&self) -> &QuotaStore {
        &self.quotas
    }

    /// Handles one query end to end. `user_key` scopes the rate-limit
    /// record; distinct users never contend.
    #[instrument(skip(self, query))]
    pub async fn handle(
        &self,
        user_key: &str,
        query: AssistQuery,
    ) -> Result<AssistReply, AssistError> {
        let started = Instant::now();
        self.metrics.inc_request();
        let query_id = Uuid::new_v4();

        let message = query.message.trim();
        if message.is_empty() {
            return Err(AssistError::validation("message required"));
        }

        let (Some(locator), Some(planner), Some(synthesizer)) = (
            self.locator.as_ref(),
            self.planner.as_ref(),
            self.synthesizer.as_ref(),
        ) else {
            return Err(AssistError::configuration(
                "provider credentials are not configured",
            ));
        };

        let intent = classify(message);

        let context = match intent {
            Intent::Place(category) => {
                let Some(origin) = query.location() else {
                    return Err(AssistError::validation("location required"));
                };

                self.metrics.inc_place_lookup();
                let place = match locator.find_nearest(category, origin).await {
                    Ok(place) => place,
                    Err(cause) => {
                        error!(query_id = %query_id, error = %cause, "place search failed");
                        return Err(AssistError::upstream("place search is unavailable"));
                    }
                };

                let Some(place) = place else {
                    // Zero matches is a successful reply with negative
                    // content, not an error.
                    info!(query_id = %query_id, category = category.label(), "no nearby place");
                    self.metrics.observe_latency(started.elapsed());
                    return Ok(AssistReply {
                        text: NO_NEARBY_RESULTS_REPLY.to_string(),
                    });
                };

                let route = match place.coordinates {
                    Some(destination) => {
                        self.metrics.inc_route_lookup();
                        match planner.plan(origin, destination).await {
                            Ok(route) => route,
                            Err(cause) => {
                                warn!(query_id = %query_id, error = %cause, "route lookup failed");
                                None
                            }
                        }
                    }
                    None => None,
                };
                if route.is_none() {
                    self.metrics.inc_degraded_route();
                }

                ReplyContext::Informational {
                    category,
                    place,
                    route,
                }
            }
            conversational => ReplyContext::Conversational {
                intent: conversational,
            },
        };

        let composed = self.synthesize(user_key, synthesizer, &context).await;

        self.metrics.observe_latency(started.elapsed());
        info!(
            query_id = %query_id,
            intent = ?intent,
            fallback = composed.fallback_used,
            "assist query handled"
        );

        Ok(AssistReply {
            text: composed.text,
        })
    }

    /// Consults the caller's quota record before the generation call and
    /// folds any provider-reported quota back into the store afterwards.
    /// An exhausted record degrades to the deterministic fallback rather
    /// than hitting the provider.
    async fn synthesize(
        &self,
        user_key: &str,
        synthesizer: &G,
        context: &ReplyContext,
    ) -> ComposedReply {
        match self.quotas.get(user_key) {
            Some(record) if record.exhausted_at(Utc::now()) => {
                warn!(user_key, "generation quota exhausted, serving fallback");
                self.metrics.inc_synth_fallback();
                ComposedReply {
                    text: synthesizer.fallback_text(context),
                    fallback_used: true,
                    quota: None,
                }
            }
            _ => {
                let composed = synthesizer.compose(context).await;
                if composed.fallback_used {
                    self.metrics.inc_synth_fallback();
                }
                if let Some(usage) = composed.quota {
                    self.quotas.upsert(user_key, usage);
                }
                composed
            }
        }
    }
}
