//! Read-through loading of the homepage content.
//!
//! The three cached lists are served only when all of them hit. A single
//! miss refetches all three from the source and writes each successful
//! fetch back with its own TTL.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::cache::PageCache;
use crate::error::Result;
use crate::homepage::source::ContentSource;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HomepageData {
    pub testimonials: Vec<Value>,
    pub faq: Vec<Value>,
    pub course_levels: Vec<Value>,
    /// `true` when every list came from the cache
    pub cached: bool,
}

impl HomepageData {
    pub fn empty() -> Self {
        Self {
            testimonials: Vec::new(),
            faq: Vec::new(),
            course_levels: Vec::new(),
            cached: false,
        }
    }
}

#[derive(Clone)]
pub struct HomepageLoader {
    page: PageCache,
    source: Arc<dyn ContentSource>,
    testimonial_limit: usize,
}

impl HomepageLoader {
    pub fn new(page: PageCache, source: Arc<dyn ContentSource>, testimonial_limit: usize) -> Self {
        Self {
            page,
            source,
            testimonial_limit,
        }
    }

    /// Loads the homepage content, from cache when complete.
    ///
    /// Fetch failures become empty lists. The only error returned is a
    /// connection fault under the throwing fault policy.
    pub async fn load(&self) -> Result<HomepageData> {
        let (testimonials, faq, course_levels) = tokio::join!(
            self.page.get_testimonials::<Vec<Value>>(),
            self.page.get_faq::<Vec<Value>>(),
            self.page.get_course_levels::<Vec<Value>>(),
        );

        if let (Some(testimonials), Some(faq), Some(course_levels)) =
            (testimonials?, faq?, course_levels?)
        {
            debug!("Serving homepage content from cache");
            return Ok(HomepageData {
                testimonials,
                faq,
                course_levels,
                cached: true,
            });
        }

        info!("Homepage cache miss, fetching fresh content");
        let (testimonials, faq, course_levels) = tokio::join!(
            self.source.fetch_testimonials(self.testimonial_limit),
            self.source.fetch_faq(),
            self.source.fetch_course_levels(),
        );

        let testimonials = match testimonials {
            Ok(rows) => {
                self.page.set_testimonials(&rows, None).await?;
                rows
            }
            Err(e) => {
                warn!(error = %e, "Failed to fetch testimonials");
                Vec::new()
            }
        };

        let faq = match faq {
            Ok(rows) => {
                self.page.set_faq(&rows, None).await?;
                rows
            }
            Err(e) => {
                warn!(error = %e, "Failed to fetch FAQ");
                Vec::new()
            }
        };

        let course_levels = match course_levels {
            Ok(rows) => {
                self.page.set_course_levels(&rows, None).await?;
                rows
            }
            Err(e) => {
                warn!(error = %e, "Failed to fetch course levels");
                Vec::new()
            }
        };

        Ok(HomepageData {
            testimonials,
            faq,
            course_levels,
            cached: false,
        })
    }
}
