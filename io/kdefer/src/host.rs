//! Running the receive task on an OS thread.

use std::{
    io,
    thread::{self, JoinHandle},
};

use ksync::{HostTasks, Priority};
use net::EmacOps;

use crate::{
    filter::FrameFilter,
    netif::NetIf,
    queue::{RxConsumer, RxSink},
    rx::RxWorker,
};

fn rx_main<E, F, S>(mut worker: RxWorker<E, F, S, HostTasks>, priority: Priority)
where
    E: EmacOps,
    F: FrameFilter,
    S: RxSink,
{
    HostTasks::set_current_priority(priority);
    worker.run()
}

impl<E, F, S> RxWorker<E, F, S, HostTasks>
where
    E: EmacOps + 'static,
    F: FrameFilter + Send + 'static,
    S: RxSink + Send + 'static,
{
    /// Starts the receive task on a detached thread running at `priority`.
    pub fn spawn(self, priority: Priority) -> io::Result<JoinHandle<()>> {
        thread::Builder::new()
            .name("emac-rx".into())
            .spawn(move || rx_main(self, priority))
    }
}

impl<E: EmacOps + 'static> NetIf<E, HostTasks> {
    /// Starts the receive task at the configured priority and returns the
    /// consumer end of its forwarding queue.
    pub fn start_rx<F>(&self, filter: F) -> io::Result<RxConsumer>
    where
        F: FrameFilter + Send + 'static,
    {
        let (worker, rx) = self.rx_path(filter);
        worker.spawn(self.config().rx_priority)?;
        Ok(rx)
    }
}
