// Settlement engine: every mutation that enforces the sold-player /
// team-budget invariant.
//
// Each operation reads the records it needs, builds one WriteBatch, and
// applies it. On the local backend a batch is one transaction, so a player
// is never observed sold without the matching budget deduction (or vice
// versa); on the remote backend the batch replays as sequential HTTP calls
// and atomicity is best-effort (see store::remote).

use std::collections::{BTreeMap, BTreeSet};

use tracing::info;

use crate::model::{Player, PlayerStatus, Team};
use crate::seed::SeedSource;
use crate::store::{Mutation, PlayerFilter, RecordStore, StoreError, WriteBatch};

/// The auction invariant enforcer, backend-agnostic over any [`RecordStore`].
pub struct SettlementEngine<S> {
    store: S,
    seed: SeedSource,
}

impl<S: RecordStore> SettlementEngine<S> {
    pub fn new(store: S, seed: SeedSource) -> Self {
        SettlementEngine { store, seed }
    }

    /// The underlying store, for read access.
    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn seed_source(&self) -> &SeedSource {
        &self.seed
    }

    async fn require_player(&self, id: &str) -> Result<Player, StoreError> {
        self.store
            .player(id)
            .await?
            .ok_or_else(|| StoreError::player_not_found(id))
    }

    async fn require_team(&self, id: &str) -> Result<Team, StoreError> {
        self.store
            .team(id)
            .await?
            .ok_or_else(|| StoreError::team_not_found(id))
    }

    // ------------------------------------------------------------------
    // Auction operations
    // ------------------------------------------------------------------

    /// Settle a sale: mark the player sold to `team_id` at `bid`, append the
    /// player to the team's roster, and deduct the bid from the team budget.
    ///
    /// Preconditions left to the caller by design: the engine does NOT check
    /// that `bid <= team.budget` (budgets may go negative) and does NOT
    /// guard the player's current status, so re-selling a Sold or Unsold
    /// player is permitted (re-auctioning is an operator decision).
    pub async fn sell(&self, player_id: &str, team_id: &str, bid: i64) -> Result<(), StoreError> {
        let mut player = self.require_player(player_id).await?;
        let mut team = self.require_team(team_id).await?;

        info!(
            "settling sale: {} -> {} for {}",
            player.name, team.name, bid
        );

        player.status = PlayerStatus::Sold;
        player.sold_price = Some(bid);
        player.team_id = Some(team.id.clone());

        team.players.push(player.id.clone());
        team.budget -= bid;

        let batch = WriteBatch::from(vec![Mutation::PutPlayer(player), Mutation::PutTeam(team)]);
        self.store.apply(batch).await
    }

    /// Mark a player unsold. Only the status changes; sold_price/team_id are
    /// left as-is (source behavior — in the supported flow unsold is applied
    /// to players still on the block, which carry neither).
    pub async fn unsell(&self, player_id: &str) -> Result<(), StoreError> {
        let mut player = self.require_player(player_id).await?;
        player.status = PlayerStatus::Unsold;
        self.store
            .apply(WriteBatch::from(vec![Mutation::PutPlayer(player)]))
            .await
    }

    /// Delete a single player, refunding their sold price to the owning team.
    pub async fn delete_player(&self, player_id: &str) -> Result<(), StoreError> {
        let ids = [player_id.to_string()];
        self.delete_players(&ids).await
    }

    /// Delete a set of players in one atomic batch.
    ///
    /// For each sold player the winning bid is refunded to the owning team
    /// and the player id removed from that team's roster; refunds for the
    /// same team accumulate. Equivalent to N sequential single deletes, but
    /// applied as one unit.
    pub async fn delete_players(&self, player_ids: &[String]) -> Result<(), StoreError> {
        // team id -> (accumulated refund, player ids leaving the roster)
        let mut refunds: BTreeMap<String, (i64, BTreeSet<String>)> = BTreeMap::new();
        let mut deletes: Vec<Mutation> = Vec::new();

        for id in player_ids {
            if let Some(player) = self.store.player(id).await? {
                if let (Some(team_id), Some(price)) = (player.team_id.clone(), player.sold_price) {
                    let entry = refunds.entry(team_id).or_default();
                    entry.0 += price;
                    entry.1.insert(player.id);
                }
            }
            deletes.push(Mutation::DeletePlayer(id.clone()));
        }

        let mut batch = WriteBatch::new();
        for (team_id, (refund, removed)) in refunds {
            if let Some(mut team) = self.store.team(&team_id).await? {
                team.budget += refund;
                team.players.retain(|pid| !removed.contains(pid));
                batch.push(Mutation::PutTeam(team));
            }
        }
        for delete in deletes {
            batch.push(delete);
        }

        info!(count = player_ids.len(), "deleting players");
        self.store.apply(batch).await
    }

    /// Delete every player: all team rosters empty out and budgets return to
    /// their ceiling, then the players collection is cleared. Idempotent.
    pub async fn delete_all_players(&self) -> Result<(), StoreError> {
        let mut batch = WriteBatch::new();
        for mut team in self.store.teams().await? {
            team.players.clear();
            team.budget = team.max_budget;
            batch.push(Mutation::PutTeam(team));
        }
        batch.push(Mutation::ClearPlayers);

        info!("deleting all players");
        self.store.apply(batch).await
    }

    /// Delete a team, releasing every player it owns back to Available with
    /// team_id and sold_price cleared. Deleting an unknown id is a no-op.
    pub async fn delete_team(&self, team_id: &str) -> Result<(), StoreError> {
        let mut batch = WriteBatch::new();
        for player in self.store.players(&PlayerFilter::by_team(team_id)).await? {
            batch.push(Mutation::PutPlayer(release(player)));
        }
        batch.push(Mutation::DeleteTeam(team_id.to_string()));

        info!(team_id, "deleting team");
        self.store.apply(batch).await
    }

    /// Delete every team, releasing all players that reference an existing
    /// team. Players with dangling team references are left untouched.
    pub async fn delete_all_teams(&self) -> Result<(), StoreError> {
        let team_ids: BTreeSet<String> = self
            .store
            .teams()
            .await?
            .into_iter()
            .map(|t| t.id)
            .collect();

        let mut batch = WriteBatch::new();
        for player in self.store.players(&PlayerFilter::all()).await? {
            let owned = player
                .team_id
                .as_deref()
                .is_some_and(|id| team_ids.contains(id));
            if owned {
                batch.push(Mutation::PutPlayer(release(player)));
            }
        }
        batch.push(Mutation::ClearTeams);

        info!("deleting all teams");
        self.store.apply(batch).await
    }

    /// Clear both collections and reload the seed data. The end state equals
    /// the seed source regardless of prior state.
    pub async fn reset(&self) -> Result<(), StoreError> {
        let seed = self.seed.load();

        let mut batch = WriteBatch::from(vec![Mutation::ClearPlayers, Mutation::ClearTeams]);
        for player in seed.players {
            batch.push(Mutation::InsertPlayer(player));
        }
        for team in seed.teams {
            batch.push(Mutation::InsertTeam(team));
        }

        info!("resetting to seed data");
        self.store.apply(batch).await
    }

    // ------------------------------------------------------------------
    // Plain record maintenance
    // ------------------------------------------------------------------

    /// Create a team with `budget == max_budget == budget` and a fresh id.
    pub async fn add_team(
        &self,
        name: &str,
        owner: &str,
        icon_player: &str,
        budget: i64,
    ) -> Result<Team, StoreError> {
        let team = Team::new(name, owner, icon_player, budget);
        self.store
            .apply(WriteBatch::from(vec![Mutation::InsertTeam(team.clone())]))
            .await?;
        Ok(team)
    }

    /// Insert a new player. No cross-record effects.
    pub async fn add_player(&self, player: Player) -> Result<(), StoreError> {
        self.store
            .apply(WriteBatch::from(vec![Mutation::InsertPlayer(player)]))
            .await
    }

    /// Upsert a player record. No cross-record effects.
    pub async fn update_player(&self, player: Player) -> Result<(), StoreError> {
        self.store
            .apply(WriteBatch::from(vec![Mutation::PutPlayer(player)]))
            .await
    }

    /// Upsert a team record. No cross-record effects.
    pub async fn update_team(&self, team: Team) -> Result<(), StoreError> {
        self.store
            .apply(WriteBatch::from(vec![Mutation::PutTeam(team)]))
            .await
    }
}

/// Reset a player released by team deletion: back to the open pool with no
/// owner and no price.
fn release(mut player: Player) -> Player {
    player.status = PlayerStatus::Available;
    player.team_id = None;
    player.sold_price = None;
    player
}
