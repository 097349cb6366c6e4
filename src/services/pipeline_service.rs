//! Client pipeline: CRUD plus the stage/sort-order move operation.
//!
//! Sort keys are dense integers per stage. A move shifts the neighbors it
//! displaces and rewrites the moved row, all inside one transaction, so the
//! optimistic client UI can reconcile against the returned record or revert.

use sqlx::PgPool;
use uuid::Uuid;

use crate::database::models::Client;
use crate::types::PipelineStage;

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Client not found: {0}")]
    ClientNotFound(Uuid),
    #[error("Unknown pipeline stage: {0}")]
    InvalidStage(String),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct NewClient {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub notes: Option<String>,
    pub stage: Option<PipelineStage>,
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct ClientChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub notes: Option<String>,
}

/// A positional shift applied to the cards of one stage: every card with
/// `lo <= sort_order < hi` moves by `delta`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shift {
    pub stage: PipelineStage,
    pub lo: i32,
    pub hi: i32,
    pub delta: i32,
}

/// Compute the neighbor shifts for moving a card from `(stage, pos)` to
/// `(dest_stage, new_pos)`. Pure; the caller turns each shift into one
/// UPDATE. Positions are assumed clamped to the destination's range.
pub fn plan_move(
    stage: PipelineStage,
    pos: i32,
    dest_stage: PipelineStage,
    new_pos: i32,
) -> Vec<Shift> {
    if stage == dest_stage {
        if new_pos > pos {
            // Cards between the old and new slot slide down one
            vec![Shift { stage, lo: pos + 1, hi: new_pos + 1, delta: -1 }]
        } else if new_pos < pos {
            // Cards between the new and old slot slide up one
            vec![Shift { stage, lo: new_pos, hi: pos, delta: 1 }]
        } else {
            Vec::new()
        }
    } else {
        vec![
            // Close the gap left in the source stage
            Shift { stage, lo: pos + 1, hi: i32::MAX, delta: -1 },
            // Open a slot in the destination stage
            Shift { stage: dest_stage, lo: new_pos, hi: i32::MAX, delta: 1 },
        ]
    }
}

/// List all pipeline clients for a shop, in board order.
pub async fn list_clients(pool: &PgPool, shop_id: Uuid) -> Result<Vec<Client>, PipelineError> {
    let clients = sqlx::query_as::<_, Client>(
        r#"
        SELECT id, shop_id, name, email, phone, stage, sort_order, notes, created_at, updated_at
        FROM clients
        WHERE shop_id = $1
        ORDER BY stage, sort_order, created_at
        "#,
    )
    .bind(shop_id)
    .fetch_all(pool)
    .await?;

    Ok(clients)
}

/// Create a client at the tail of its stage (defaults to leads).
pub async fn create_client(
    pool: &PgPool,
    shop_id: Uuid,
    input: NewClient,
) -> Result<Client, PipelineError> {
    let stage = input.stage.unwrap_or(PipelineStage::Leads);

    let client = sqlx::query_as::<_, Client>(
        r#"
        INSERT INTO clients (id, shop_id, name, email, phone, stage, sort_order, notes)
        VALUES (
            $1, $2, $3, $4, $5, $6,
            COALESCE((SELECT MAX(sort_order) + 1 FROM clients WHERE shop_id = $2 AND stage = $6), 0),
            $7
        )
        RETURNING id, shop_id, name, email, phone, stage, sort_order, notes, created_at, updated_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(shop_id)
    .bind(&input.name)
    .bind(&input.email)
    .bind(&input.phone)
    .bind(stage.as_str())
    .bind(&input.notes)
    .fetch_one(pool)
    .await?;

    Ok(client)
}

pub async fn get_client(
    pool: &PgPool,
    shop_id: Uuid,
    client_id: Uuid,
) -> Result<Client, PipelineError> {
    sqlx::query_as::<_, Client>(
        r#"
        SELECT id, shop_id, name, email, phone, stage, sort_order, notes, created_at, updated_at
        FROM clients
        WHERE id = $1 AND shop_id = $2
        "#,
    )
    .bind(client_id)
    .bind(shop_id)
    .fetch_optional(pool)
    .await?
    .ok_or(PipelineError::ClientNotFound(client_id))
}

/// Update contact fields and notes; stage and position only change via move.
pub async fn update_client(
    pool: &PgPool,
    shop_id: Uuid,
    client_id: Uuid,
    changes: ClientChanges,
) -> Result<Client, PipelineError> {
    sqlx::query_as::<_, Client>(
        r#"
        UPDATE clients SET
            name = COALESCE($3, name),
            email = COALESCE($4, email),
            phone = COALESCE($5, phone),
            notes = COALESCE($6, notes),
            updated_at = NOW()
        WHERE id = $1 AND shop_id = $2
        RETURNING id, shop_id, name, email, phone, stage, sort_order, notes, created_at, updated_at
        "#,
    )
    .bind(client_id)
    .bind(shop_id)
    .bind(&changes.name)
    .bind(&changes.email)
    .bind(&changes.phone)
    .bind(&changes.notes)
    .fetch_optional(pool)
    .await?
    .ok_or(PipelineError::ClientNotFound(client_id))
}

pub async fn delete_client(
    pool: &PgPool,
    shop_id: Uuid,
    client_id: Uuid,
) -> Result<(), PipelineError> {
    let result = sqlx::query("DELETE FROM clients WHERE id = $1 AND shop_id = $2")
        .bind(client_id)
        .bind(shop_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(PipelineError::ClientNotFound(client_id));
    }
    Ok(())
}

/// Move a client to `(dest_stage, position)`, shifting displaced neighbors.
/// Returns the post-move record so the optimistic UI can reconcile.
pub async fn move_client(
    pool: &PgPool,
    shop_id: Uuid,
    client_id: Uuid,
    dest_stage: PipelineStage,
    position: i32,
) -> Result<Client, PipelineError> {
    let mut tx = pool.begin().await?;

    let current: Option<(String, i32)> = sqlx::query_as(
        "SELECT stage, sort_order FROM clients WHERE id = $1 AND shop_id = $2 FOR UPDATE",
    )
    .bind(client_id)
    .bind(shop_id)
    .fetch_optional(&mut *tx)
    .await?;

    let (stage_raw, old_pos) = current.ok_or(PipelineError::ClientNotFound(client_id))?;
    let old_stage =
        PipelineStage::parse(&stage_raw).ok_or(PipelineError::InvalidStage(stage_raw))?;

    // Clamp the requested slot to the destination's occupancy
    let (dest_count,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM clients WHERE shop_id = $1 AND stage = $2",
    )
    .bind(shop_id)
    .bind(dest_stage.as_str())
    .fetch_one(&mut *tx)
    .await?;

    let max_pos = if old_stage == dest_stage {
        (dest_count as i32 - 1).max(0)
    } else {
        dest_count as i32
    };
    let new_pos = position.clamp(0, max_pos);

    for shift in plan_move(old_stage, old_pos, dest_stage, new_pos) {
        sqlx::query(
            r#"
            UPDATE clients SET sort_order = sort_order + $4, updated_at = NOW()
            WHERE shop_id = $1 AND stage = $2
              AND sort_order >= $3 AND sort_order < $5
              AND id <> $6
            "#,
        )
        .bind(shop_id)
        .bind(shift.stage.as_str())
        .bind(shift.lo)
        .bind(shift.delta)
        .bind(shift.hi)
        .bind(client_id)
        .execute(&mut *tx)
        .await?;
    }

    let client = sqlx::query_as::<_, Client>(
        r#"
        UPDATE clients SET stage = $3, sort_order = $4, updated_at = NOW()
        WHERE id = $1 AND shop_id = $2
        RETURNING id, shop_id, name, email, phone, stage, sort_order, notes, created_at, updated_at
        "#,
    )
    .bind(client_id)
    .bind(shop_id)
    .bind(dest_stage.as_str())
    .bind(new_pos)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(client)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// In-memory board mirroring the SQL a move executes: apply each shift,
    /// then rewrite the moved card.
    #[derive(Debug, Clone)]
    struct Board {
        cards: Vec<(char, PipelineStage, i32)>,
    }

    impl Board {
        fn new(cards: Vec<(char, PipelineStage, i32)>) -> Self {
            Self { cards }
        }

        fn apply_move(&mut self, name: char, dest: PipelineStage, new_pos: i32) {
            let (_, stage, pos) = *self.cards.iter().find(|(n, _, _)| *n == name).unwrap();
            for shift in plan_move(stage, pos, dest, new_pos) {
                for card in &mut self.cards {
                    if card.0 != name
                        && card.1 == shift.stage
                        && card.2 >= shift.lo
                        && card.2 < shift.hi
                    {
                        card.2 += shift.delta;
                    }
                }
            }
            let moved = self.cards.iter_mut().find(|(n, _, _)| *n == name).unwrap();
            moved.1 = dest;
            moved.2 = new_pos;
        }

        fn stage_order(&self, stage: PipelineStage) -> Vec<char> {
            let mut cards: Vec<_> = self
                .cards
                .iter()
                .filter(|(_, s, _)| *s == stage)
                .copied()
                .collect();
            cards.sort_by_key(|(_, _, pos)| *pos);
            cards.into_iter().map(|(n, _, _)| n).collect()
        }

        fn positions(&self, stage: PipelineStage) -> Vec<i32> {
            let mut positions: Vec<_> = self
                .cards
                .iter()
                .filter(|(_, s, _)| *s == stage)
                .map(|(_, _, pos)| *pos)
                .collect();
            positions.sort_unstable();
            positions
        }
    }

    fn leads_board() -> Board {
        Board::new(vec![
            ('a', PipelineStage::Leads, 0),
            ('b', PipelineStage::Leads, 1),
            ('c', PipelineStage::Leads, 2),
            ('d', PipelineStage::Leads, 3),
            ('x', PipelineStage::Consulting, 0),
            ('y', PipelineStage::Consulting, 1),
        ])
    }

    #[test]
    fn same_stage_move_down_keeps_others_in_order() {
        let mut board = leads_board();
        board.apply_move('a', PipelineStage::Leads, 2);

        assert_eq!(board.stage_order(PipelineStage::Leads), vec!['b', 'c', 'a', 'd']);
        assert_eq!(board.positions(PipelineStage::Leads), vec![0, 1, 2, 3]);
        // Other stages untouched
        assert_eq!(board.stage_order(PipelineStage::Consulting), vec!['x', 'y']);
    }

    #[test]
    fn same_stage_move_up_keeps_others_in_order() {
        let mut board = leads_board();
        board.apply_move('d', PipelineStage::Leads, 1);

        assert_eq!(board.stage_order(PipelineStage::Leads), vec!['a', 'd', 'b', 'c']);
        assert_eq!(board.positions(PipelineStage::Leads), vec![0, 1, 2, 3]);
    }

    #[test]
    fn move_to_same_slot_is_a_no_op() {
        let mut board = leads_board();
        board.apply_move('b', PipelineStage::Leads, 1);

        assert_eq!(board.stage_order(PipelineStage::Leads), vec!['a', 'b', 'c', 'd']);
        assert!(plan_move(PipelineStage::Leads, 1, PipelineStage::Leads, 1).is_empty());
    }

    #[test]
    fn cross_stage_move_closes_gap_and_opens_slot() {
        let mut board = leads_board();
        board.apply_move('b', PipelineStage::Consulting, 1);

        // Source stage closed the gap, stayed in order and dense
        assert_eq!(board.stage_order(PipelineStage::Leads), vec!['a', 'c', 'd']);
        assert_eq!(board.positions(PipelineStage::Leads), vec![0, 1, 2]);
        // Destination opened slot 1 and kept x/y relative order
        assert_eq!(board.stage_order(PipelineStage::Consulting), vec!['x', 'b', 'y']);
        assert_eq!(board.positions(PipelineStage::Consulting), vec![0, 1, 2]);
    }

    #[test]
    fn cross_stage_move_to_tail_of_empty_stage() {
        let mut board = leads_board();
        board.apply_move('c', PipelineStage::Inking, 0);

        assert_eq!(board.stage_order(PipelineStage::Inking), vec!['c']);
        assert_eq!(board.stage_order(PipelineStage::Leads), vec!['a', 'b', 'd']);
    }
}
