use actor_runtime::{Actor, ActorError, Address, Context, DependencyUpdate, Handler, Notifiable};
use async_trait::async_trait;
use tracing::{debug, info};

/// Produces a strictly increasing reading per generation.
#[derive(Debug, Default)]
pub struct Source {
    produced: u64,
}

impl Source {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Actor for Source {}

/// Next reading, starting at 1.
#[derive(Debug)]
pub struct Read;

/// Fails the source's Context.
#[derive(Debug)]
pub struct Crash;

#[async_trait]
impl Handler<Read> for Source {
    type Response = u64;

    async fn handle(&mut self, _: Read, _: &Context<Self>) -> u64 {
        self.produced += 1;
        self.produced
    }
}

#[async_trait]
impl Notifiable<Crash> for Source {
    async fn notify(&mut self, _: Crash, ctx: &Context<Self>) {
        ctx.fail("source crashed");
    }
}

/// Pulls readings from whichever source it was last told about.
#[derive(Debug)]
pub struct Sink {
    source: Address<Source>,
    readings: Vec<u64>,
}

impl Sink {
    pub fn new(source: Address<Source>) -> Self {
        Self {
            source,
            readings: Vec::new(),
        }
    }
}

impl Actor for Sink {}

/// Reads one value from the source and keeps it.
#[derive(Debug)]
pub struct Pull;

/// Every reading pulled so far.
#[derive(Debug)]
pub struct Pulled;

#[async_trait]
impl Handler<Pull> for Sink {
    type Response = Result<u64, ActorError>;

    async fn handle(&mut self, _: Pull, _: &Context<Self>) -> Self::Response {
        let reading = self.source.send(Read).await?;
        self.readings.push(reading);
        debug!(reading, "Reading pulled");
        Ok(reading)
    }
}

#[async_trait]
impl Handler<Pulled> for Sink {
    type Response = Vec<u64>;

    async fn handle(&mut self, _: Pulled, _: &Context<Self>) -> Vec<u64> {
        self.readings.clone()
    }
}

#[async_trait]
impl Notifiable<DependencyUpdate<Source>> for Sink {
    async fn notify(&mut self, update: DependencyUpdate<Source>, _: &Context<Self>) {
        info!(role = update.role, "Source replaced, switching Address");
        self.source = update.address;
    }
}
