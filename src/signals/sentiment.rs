// src/signals/sentiment.rs
//! Sentiment magnitude: strongly positive and strongly negative news score alike.

use std::sync::Arc;

use super::{ItemView, Signal, SignalContext, SignalScore};
use crate::sentiment::SentimentModel;
use crate::types::SignalKind;

pub struct Sentiment {
    model: Arc<dyn SentimentModel>,
}

impl Sentiment {
    pub fn new(model: Arc<dyn SentimentModel>) -> Self {
        Self { model }
    }
}

impl Signal for Sentiment {
    fn kind(&self) -> SignalKind {
        SignalKind::Sentiment
    }

    fn score(&self, item: &ItemView<'_>, _ctx: &SignalContext<'_>) -> SignalScore {
        SignalScore::exact(self.model.polarity(item.text).abs())
    }
}
