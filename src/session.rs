//! Per-board session controller.
//!
//! One [`BoardSession`] per open board, constructed on open and torn down on
//! close; the `loaded` flag and the event subscription live and die with it.
//! Everything runs on the caller's task: pointer events drive `apply_move`,
//! and the embedding event loop calls `pump_remote` to drain and apply
//! events from co-present clients.

use crate::backend::{Backend, ColumnPatch};
use crate::domain::{check_limit, BoardId, BoardState, ColumnId, WipStatus};
use crate::drag::MoveRequest;
use crate::engine::{BoardEngine, RemoteOutcome};
use crate::error::{LanekitError, Result};
use crate::sync::{BoardChannel, ClientId, MoveEvent};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{info, warn};

/// WIP check result for one affected column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WipReport {
    pub column: ColumnId,
    pub status: WipStatus,
}

/// Result of [`BoardSession::apply_move`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveOutcome {
    /// False when the request resolved to a no-op
    pub committed: bool,
    /// WIP status of each column whose task count changed
    pub wip: Vec<WipReport>,
}

impl MoveOutcome {
    fn noop() -> Self {
        Self {
            committed: false,
            wip: Vec::new(),
        }
    }
}

/// A client's live connection to one board
pub struct BoardSession<B, C> {
    client_id: ClientId,
    engine: BoardEngine,
    backend: Arc<B>,
    channel: Arc<C>,
    events: broadcast::Receiver<MoveEvent>,
    loaded: bool,
    stale: bool,
}

impl<B: Backend, C: BoardChannel> BoardSession<B, C> {
    /// Opens a session: loads the board from the backend and joins its room
    pub async fn open(backend: Arc<B>, channel: Arc<C>, board: BoardId) -> Result<Self> {
        let state = backend.load_board(&board).await?;
        channel.join(&board).await?;
        let events = channel.subscribe(&board);
        let client_id = ClientId::new();
        info!(board = %board, client = %client_id, "board session opened");

        Ok(Self {
            client_id,
            engine: BoardEngine::new(state),
            backend,
            channel,
            events,
            loaded: true,
            stale: false,
        })
    }

    pub fn client_id(&self) -> ClientId {
        self.client_id
    }

    pub fn board_id(&self) -> BoardId {
        self.engine.board_id()
    }

    pub fn state(&self) -> &BoardState {
        self.engine.state()
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// True when the session has missed or failed to follow remote events
    /// and needs a [`resync`](Self::resync)
    pub fn is_stale(&self) -> bool {
        self.stale
    }

    /// Leaves the board's room; the session stops accepting operations
    pub async fn close(&mut self) -> Result<()> {
        self.channel.leave(&self.engine.board_id()).await?;
        self.loaded = false;
        info!(board = %self.engine.board_id(), "board session closed");
        Ok(())
    }

    fn ensure_loaded(&self) -> Result<()> {
        if !self.loaded {
            return Err(LanekitError::SessionNotLoaded);
        }
        Ok(())
    }

    /// Applies a resolved drag result: optimistic local commit, then
    /// persistence, then broadcast.
    ///
    /// The local commit is visible in [`state`](Self::state) before the
    /// backend round-trip completes; if the backend rejects the move, the
    /// pre-move snapshot is restored and the error returned. A broadcast
    /// failure does not fail the move: the event is simply not delivered
    /// and the session is marked stale so peers re-converge via resync.
    pub async fn apply_move(&mut self, request: MoveRequest) -> Result<MoveOutcome> {
        self.ensure_loaded()?;

        let Some(committed) = self.engine.commit(self.client_id, request)? else {
            return Ok(MoveOutcome::noop());
        };

        let persisted = match &committed.request {
            MoveRequest::Task {
                dest_column,
                dest_index,
                ..
            } => {
                let id = match &committed.event.kind {
                    crate::sync::MoveEventKind::Task { id, .. } => id.clone(),
                    crate::sync::MoveEventKind::Column { .. } => {
                        unreachable!("task request commits a task event")
                    }
                };
                self.backend
                    .move_task(&id, dest_column, *dest_index)
                    .await
                    .map(|_| ())
            }
            MoveRequest::Column { .. } => {
                let ordered: Vec<ColumnId> = self
                    .engine
                    .state()
                    .columns
                    .iter()
                    .map(|c| c.id.clone())
                    .collect();
                self.backend
                    .reorder_columns(&self.engine.board_id(), &ordered)
                    .await
            }
        };

        if let Err(err) = persisted {
            warn!(error = %err, "backend rejected move; rolling back");
            self.engine.revert(committed);
            return Err(err);
        }

        if let Err(err) = self.channel.emit(&committed.event).await {
            warn!(error = %err, "broadcast failed; marking session stale");
            self.stale = true;
        }

        Ok(MoveOutcome {
            committed: true,
            wip: self.wip_reports(&committed.affected),
        })
    }

    /// Drains pending remote events and applies them to local state.
    ///
    /// Returns how many events were applied. Self-originated events are
    /// skipped; redundant redeliveries are ignored; an event referencing
    /// unknown state, or a lagged/closed stream, marks the session stale.
    pub fn pump_remote(&mut self) -> Result<usize> {
        self.ensure_loaded()?;
        let mut applied = 0;

        loop {
            match self.events.try_recv() {
                Ok(event) => {
                    if event.origin == self.client_id {
                        continue;
                    }
                    match self.engine.apply_remote(&event)? {
                        RemoteOutcome::Applied { affected } => {
                            applied += 1;
                            // Surfaced for logging only; the UI recomputes
                            // WIP from state when it re-renders
                            self.wip_reports(&affected);
                        }
                        RemoteOutcome::Redundant => {}
                        RemoteOutcome::Stale => {
                            self.stale = true;
                        }
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => break,
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    warn!(skipped, "event stream lagged; resync required");
                    self.stale = true;
                }
                Err(broadcast::error::TryRecvError::Closed) => {
                    self.stale = true;
                    break;
                }
            }
        }

        Ok(applied)
    }

    /// Reloads the full board from the backend.
    ///
    /// Used after a disconnection or lag instead of replaying missed events
    /// individually. Re-subscribes first so no event falls between the
    /// snapshot and the new subscription.
    pub async fn resync(&mut self) -> Result<()> {
        self.ensure_loaded()?;
        let board = self.engine.board_id();
        self.events = self.channel.subscribe(&board);
        let state = self.backend.load_board(&board).await?;
        self.engine = BoardEngine::new(state);
        self.stale = false;
        info!(board = %board, "resynced from backend");
        Ok(())
    }

    /// Changes a column's WIP limit: persists the patch, applies the
    /// persisted configuration locally, and returns the fresh check.
    pub async fn set_wip_limit(
        &mut self,
        column: &ColumnId,
        wip_limit: Option<u32>,
    ) -> Result<WipStatus> {
        self.ensure_loaded()?;

        let patch = ColumnPatch {
            name: None,
            wip_limit: Some(wip_limit),
        };
        let persisted = self.backend.update_column(column, patch).await?;
        self.engine.set_wip_limit(column, persisted.wip_limit)?;

        let column = self
            .engine
            .state()
            .find_column(column)
            .ok_or_else(|| LanekitError::ColumnNotFound(column.to_string()))?;
        Ok(check_limit(column))
    }

    fn wip_reports(&self, affected: &[ColumnId]) -> Vec<WipReport> {
        let mut reports = Vec::with_capacity(affected.len());
        for column_id in affected {
            if let Some(column) = self.engine.state().find_column(column_id) {
                let status = check_limit(column);
                if status.exceeded {
                    warn!(
                        column = %column_id,
                        count = status.count,
                        limit = ?status.limit,
                        "column over its WIP limit"
                    );
                }
                reports.push(WipReport {
                    column: column_id.clone(),
                    status,
                });
            }
        }
        reports
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::memory::InMemoryBackend;
    use crate::domain::TaskId;
    use crate::sync::LocalChannel;
    use anyhow::anyhow;
    use async_trait::async_trait;
    use std::str::FromStr;

    fn todo() -> ColumnId {
        ColumnId::from_str("to-do").unwrap()
    }

    fn in_progress() -> ColumnId {
        ColumnId::from_str("in-progress").unwrap()
    }

    fn done() -> ColumnId {
        ColumnId::from_str("done").unwrap()
    }

    fn seeded_board() -> BoardState {
        let mut board = BoardState::new("Test");
        board.add_task("T1", &todo()).unwrap();
        board.add_task("T2", &todo()).unwrap();
        board.add_task("T3", &done()).unwrap();
        board
    }

    fn task_request(source: ColumnId, si: usize, dest: ColumnId, di: usize) -> MoveRequest {
        MoveRequest::Task {
            source_column: source,
            source_index: si,
            dest_column: dest,
            dest_index: di,
        }
    }

    async fn open_session(
        board: BoardState,
    ) -> (
        BoardSession<InMemoryBackend, LocalChannel>,
        Arc<InMemoryBackend>,
        Arc<LocalChannel>,
    ) {
        let board_id = board.id;
        let backend = Arc::new(InMemoryBackend::new(board));
        let channel = Arc::new(LocalChannel::new());
        let session = BoardSession::open(backend.clone(), channel.clone(), board_id)
            .await
            .unwrap();
        (session, backend, channel)
    }

    /// Backend that rejects every mutation, for rollback tests
    struct RejectingBackend {
        inner: InMemoryBackend,
    }

    #[async_trait]
    impl Backend for RejectingBackend {
        async fn load_board(&self, board: &BoardId) -> crate::error::Result<BoardState> {
            self.inner.load_board(board).await
        }

        async fn move_task(
            &self,
            _task: &TaskId,
            _dest_column: &ColumnId,
            _dest_index: usize,
        ) -> crate::error::Result<crate::domain::Task> {
            Err(LanekitError::Backend(anyhow!("persistence unavailable")))
        }

        async fn reorder_columns(
            &self,
            _board: &BoardId,
            _ordered: &[ColumnId],
        ) -> crate::error::Result<()> {
            Err(LanekitError::Backend(anyhow!("persistence unavailable")))
        }

        async fn update_column(
            &self,
            _column: &ColumnId,
            _patch: ColumnPatch,
        ) -> crate::error::Result<crate::domain::Column> {
            Err(LanekitError::Backend(anyhow!("persistence unavailable")))
        }
    }

    #[tokio::test]
    async fn test_apply_move_commits_and_persists() {
        let (mut session, backend, _channel) = open_session(seeded_board()).await;

        let outcome = session
            .apply_move(task_request(todo(), 0, done(), 1))
            .await
            .unwrap();

        assert!(outcome.committed);
        // Local state and backend agree
        let local = session.state().clone();
        assert_eq!(backend.snapshot().find_column(&done()).unwrap().task_ids,
                   local.find_column(&done()).unwrap().task_ids);
    }

    #[tokio::test]
    async fn test_apply_move_noop() {
        let (mut session, _backend, channel) = open_session(seeded_board()).await;
        let mut rx = channel.subscribe(&session.board_id());

        let outcome = session
            .apply_move(task_request(todo(), 0, todo(), 0))
            .await
            .unwrap();

        assert!(!outcome.committed);
        assert!(outcome.wip.is_empty());
        // Nothing was broadcast
        assert!(matches!(
            rx.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));
    }

    #[tokio::test]
    async fn test_backend_failure_rolls_back() {
        let board = seeded_board();
        let board_id = board.id;
        let backend = Arc::new(RejectingBackend {
            inner: InMemoryBackend::new(board),
        });
        let channel = Arc::new(LocalChannel::new());
        let mut session = BoardSession::open(backend, channel.clone(), board_id)
            .await
            .unwrap();
        let before = session.state().clone();
        let mut rx = channel.subscribe(&board_id);

        let result = session.apply_move(task_request(todo(), 0, done(), 0)).await;

        assert!(matches!(result, Err(LanekitError::Backend(_))));
        // Optimistic commit was reverted, nothing was broadcast
        assert_eq!(session.state(), &before);
        assert!(matches!(
            rx.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));
    }

    #[tokio::test]
    async fn test_wip_warning_surfaced_on_move() {
        // Scenario C: a column with wip_limit=2 receives a third task; the
        // move succeeds and the outcome carries the exceeded status.
        let mut board = seeded_board();
        board.add_task("T4", &in_progress()).unwrap();
        board.add_task("T5", &in_progress()).unwrap();
        board
            .columns
            .iter_mut()
            .find(|c| c.id == in_progress())
            .unwrap()
            .wip_limit = Some(2);

        let (mut session, _backend, _channel) = open_session(board).await;

        let outcome = session
            .apply_move(task_request(todo(), 0, in_progress(), 2))
            .await
            .unwrap();

        assert!(outcome.committed);
        let report = outcome
            .wip
            .iter()
            .find(|r| r.column == in_progress())
            .unwrap();
        assert_eq!(
            report.status,
            WipStatus {
                exceeded: true,
                count: 3,
                limit: Some(2),
            }
        );
        // The task is present in the column regardless
        assert_eq!(session.state().tasks_in(&in_progress()).len(), 3);
    }

    #[tokio::test]
    async fn test_remote_events_converge_two_clients() {
        // Scenario D: two clients, concurrent moves in disjoint columns,
        // events exchanged, identical final state satisfying the reindex
        // invariant.
        let board = seeded_board();
        let board_id = board.id;
        let backend = Arc::new(InMemoryBackend::new(board));
        let channel = Arc::new(LocalChannel::new());

        let mut alice = BoardSession::open(backend.clone(), channel.clone(), board_id)
            .await
            .unwrap();
        let mut bob = BoardSession::open(backend.clone(), channel.clone(), board_id)
            .await
            .unwrap();

        // Alice reorders to-do, Bob moves within done -> in-progress
        alice
            .apply_move(task_request(todo(), 0, todo(), 1))
            .await
            .unwrap();
        bob.apply_move(task_request(done(), 0, in_progress(), 0))
            .await
            .unwrap();

        assert_eq!(alice.pump_remote().unwrap(), 1);
        assert_eq!(bob.pump_remote().unwrap(), 1);

        assert_eq!(alice.state(), bob.state());
        for column in &alice.state().columns {
            let tasks = alice.state().tasks_in(&column.id);
            let positions: Vec<u32> = tasks.iter().map(|t| t.position).collect();
            assert_eq!(positions, (0..tasks.len() as u32).collect::<Vec<_>>());
        }
    }

    #[tokio::test]
    async fn test_pump_skips_own_events() {
        let (mut session, _backend, _channel) = open_session(seeded_board()).await;

        session
            .apply_move(task_request(todo(), 0, done(), 0))
            .await
            .unwrap();

        // The session's receiver saw its own event; pumping must not
        // re-apply it
        let state_after_move = session.state().clone();
        assert_eq!(session.pump_remote().unwrap(), 0);
        assert_eq!(session.state(), &state_after_move);
    }

    #[tokio::test]
    async fn test_stale_event_marks_session_for_resync() {
        let (mut session, backend, channel) = open_session(seeded_board()).await;

        // A peer references a task this client has never seen
        let event = MoveEvent {
            event_id: uuid::Uuid::new_v4(),
            origin: ClientId::new(),
            board: session.board_id(),
            kind: crate::sync::MoveEventKind::Task {
                id: TaskId::new(404),
                dest_column: done(),
                dest_index: 0,
            },
        };
        channel.emit(&event).await.unwrap();

        session.pump_remote().unwrap();
        assert!(session.is_stale());

        session.resync().await.unwrap();
        assert!(!session.is_stale());
        assert_eq!(session.state(), &backend.snapshot());
    }

    #[tokio::test]
    async fn test_set_wip_limit_persists_and_checks() {
        let (mut session, backend, _channel) = open_session(seeded_board()).await;

        let status = session.set_wip_limit(&todo(), Some(1)).await.unwrap();

        assert_eq!(status.count, 2);
        assert_eq!(status.limit, Some(1));
        assert!(status.exceeded);
        assert_eq!(
            backend
                .snapshot()
                .find_column(&todo())
                .unwrap()
                .wip_limit,
            Some(1)
        );
    }

    #[tokio::test]
    async fn test_closed_session_rejects_operations() {
        let (mut session, _backend, _channel) = open_session(seeded_board()).await;

        session.close().await.unwrap();

        let result = session.apply_move(task_request(todo(), 0, done(), 0)).await;
        assert!(matches!(result, Err(LanekitError::SessionNotLoaded)));
        assert!(matches!(
            session.pump_remote(),
            Err(LanekitError::SessionNotLoaded)
        ));
    }
}
