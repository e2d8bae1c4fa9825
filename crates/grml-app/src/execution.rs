//! The kernel execution queue.
//!
//! The kernel runs one request at a time. Requests queue up while it is
//! busy; every `kernel-idle` message finishes the request in flight and
//! dispatches the next one.

use std::collections::VecDeque;

use grml_core::graph::ModelGraph;
use grml_core::id::FunctionId;
use uuid::Uuid;

/// Status reported by the kernel for a successful run.
pub const STATUS_OK: &str = "ok";

/// One queued `execute-code` request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeRequest {
    pub code: String,
    /// Prints every return value; sent instead of `code` when the function
    /// result is still current.
    pub ret_val_code: String,
    /// `None` for raw code such as a variable rename.
    pub function: Option<FunctionId>,
    pub correlation: Option<Uuid>,
    /// Code edit stamp of the function when the request was made.
    pub stamp: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Dispatched {
    function: FunctionId,
    correlation: Option<Uuid>,
}

#[derive(Debug)]
pub struct ExecutionQueue {
    pending: VecDeque<CodeRequest>,
    in_flight: Option<CodeRequest>,
    /// The last function request sent, for re-requests within one run.
    recent: Option<Dispatched>,
    idle: bool,
}

impl Default for ExecutionQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl ExecutionQueue {
    pub fn new() -> Self {
        ExecutionQueue {
            pending: VecDeque::new(),
            in_flight: None,
            recent: None,
            idle: true,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.idle
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    pub fn in_flight(&self) -> Option<&CodeRequest> {
        self.in_flight.as_ref()
    }

    /// Queues a request. Returns the code to send when the kernel was idle.
    pub fn enqueue(&mut self, request: CodeRequest, graph: &ModelGraph) -> Option<String> {
        self.pending.push_back(request);
        if self.idle {
            self.next(graph)
        } else {
            None
        }
    }

    /// Finishes the request in flight.
    ///
    /// On success returns the function and stamp to record as computed.
    /// Otherwise every pending request of the failed run is dropped: the run
    /// named by `correlation`, or the one in flight.
    pub fn finish(&mut self, status: &str, correlation: Option<Uuid>) -> Option<(FunctionId, u64)> {
        let in_flight = self.in_flight.take();
        if status == STATUS_OK {
            return in_flight.and_then(|r| r.function.map(|f| (f, r.stamp)));
        }

        let failed = correlation.or_else(|| in_flight.and_then(|r| r.correlation));
        if let Some(failed) = failed {
            let before = self.pending.len();
            self.pending.retain(|r| r.correlation != Some(failed));
            tracing::info!(
                %failed,
                status,
                purged = before - self.pending.len(),
                "kernel run failed"
            );
        }
        None
    }

    /// Dispatches the next request, or marks the kernel idle when none is
    /// left. Requests for functions that no longer exist are skipped.
    pub fn next(&mut self, graph: &ModelGraph) -> Option<String> {
        while let Some(request) = self.pending.pop_front() {
            self.idle = false;
            let Some(function) = request.function else {
                let code = request.code.clone();
                self.in_flight = Some(request);
                return Some(code);
            };
            let Ok(f) = graph.function(function) else {
                tracing::debug!(%function, "skipping request for a removed function");
                continue;
            };

            let rerequest = match self.recent {
                Some(recent) if recent.correlation == request.correlation => graph
                    .function(recent.function)
                    .map(|r| r.computed_stamp > request.stamp)
                    .unwrap_or(false),
                _ => false,
            };
            let stale = request.stamp > f.computed_stamp;
            let code = if rerequest || stale {
                request.code.clone()
            } else {
                request.ret_val_code.clone()
            };

            self.recent = Some(Dispatched {
                function,
                correlation: request.correlation,
            });
            self.in_flight = Some(request);
            return Some(code);
        }
        self.idle = true;
        self.in_flight = None;
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grml_core::builtin::{PIPELINE_MODEL, TRAIN_TEST_SPLIT};
    use grml_core::registry::Registry;

    fn graph_with(n: usize) -> (ModelGraph, Vec<FunctionId>) {
        let registry = Registry::with_builtins();
        let mut graph = ModelGraph::new(&registry, PIPELINE_MODEL).unwrap();
        let root = graph.root();
        let ids = (0..n)
            .map(|_| graph.add_function(&registry, TRAIN_TEST_SPLIT, root).unwrap())
            .collect();
        (graph, ids)
    }

    fn request(function: FunctionId, correlation: Uuid, stamp: u64) -> CodeRequest {
        CodeRequest {
            code: format!("run {function}"),
            ret_val_code: format!("print {function}"),
            function: Some(function),
            correlation: Some(correlation),
            stamp,
        }
    }

    #[test]
    fn ok_advances_exactly_one() {
        let (graph, ids) = graph_with(3);
        let run = Uuid::new_v4();
        let mut queue = ExecutionQueue::new();

        assert_eq!(queue.enqueue(request(ids[0], run, 1), &graph), Some(format!("run {}", ids[0])));
        assert_eq!(queue.enqueue(request(ids[1], run, 1), &graph), None);
        assert_eq!(queue.enqueue(request(ids[2], run, 1), &graph), None);
        assert!(!queue.is_idle());

        assert_eq!(queue.finish(STATUS_OK, None), Some((ids[0], 1)));
        assert!(queue.next(&graph).is_some());
        assert_eq!(queue.pending(), 1);
        assert_eq!(queue.in_flight().and_then(|r| r.function), Some(ids[1]));
    }

    #[test]
    fn failure_purges_only_the_failed_run() {
        let (graph, ids) = graph_with(4);
        let (one, two, three) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let mut queue = ExecutionQueue::new();
        queue.enqueue(request(ids[0], one, 1), &graph);
        queue.enqueue(request(ids[1], two, 1), &graph);
        queue.enqueue(request(ids[2], two, 1), &graph);
        queue.enqueue(request(ids[3], three, 1), &graph);

        queue.finish(STATUS_OK, None);
        queue.next(&graph);
        // the first request of run two fails, its second request goes too
        assert_eq!(queue.finish("error", None), None);
        assert_eq!(queue.next(&graph), Some(format!("run {}", ids[3])));
        assert_eq!(queue.pending(), 0);

        queue.finish(STATUS_OK, None);
        assert_eq!(queue.next(&graph), None);
        assert!(queue.is_idle());
    }

    #[test]
    fn failure_naming_a_queued_run_leaves_the_others() {
        let (graph, ids) = graph_with(4);
        let (one, two, three) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let mut queue = ExecutionQueue::new();
        queue.enqueue(request(ids[0], one, 1), &graph);
        queue.enqueue(request(ids[1], two, 1), &graph);
        queue.enqueue(request(ids[2], one, 1), &graph);
        queue.enqueue(request(ids[3], three, 1), &graph);
        assert_eq!(queue.in_flight().and_then(|r| r.correlation), Some(one));

        assert_eq!(queue.finish("error", Some(two)), None);
        assert_eq!(queue.pending(), 2);
        assert_eq!(queue.next(&graph), Some(format!("run {}", ids[2])));
        queue.finish(STATUS_OK, None);
        assert_eq!(queue.next(&graph), Some(format!("run {}", ids[3])));
        queue.finish(STATUS_OK, None);
        assert_eq!(queue.next(&graph), None);
    }

    #[test]
    fn current_results_only_print() {
        let (mut graph, ids) = graph_with(1);
        graph.function_mut(ids[0]).unwrap().computed_stamp = 5;
        let mut queue = ExecutionQueue::new();
        let sent = queue.enqueue(request(ids[0], Uuid::new_v4(), 5), &graph);
        assert_eq!(sent, Some(format!("print {}", ids[0])));
    }

    #[test]
    fn raw_code_is_sent_verbatim() {
        let (graph, _) = graph_with(0);
        let mut queue = ExecutionQueue::new();
        let sent = queue.enqueue(
            CodeRequest {
                code: "del x".into(),
                ret_val_code: String::new(),
                function: None,
                correlation: None,
                stamp: 0,
            },
            &graph,
        );
        assert_eq!(sent.as_deref(), Some("del x"));
        assert_eq!(queue.finish(STATUS_OK, None), None);
    }

    #[test]
    fn removed_functions_are_skipped() {
        let (mut graph, ids) = graph_with(2);
        let run = Uuid::new_v4();
        let mut queue = ExecutionQueue::new();
        queue.enqueue(request(ids[0], run, 1), &graph);
        queue.enqueue(request(ids[1], run, 1), &graph);
        graph.remove_function(ids[1]).unwrap();
        queue.finish(STATUS_OK, None);
        assert_eq!(queue.next(&graph), None);
        assert!(queue.is_idle());
    }
}
