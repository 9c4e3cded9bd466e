use crate::{
    GroupBalance, GroupBalanceQuery, GroupDetail, ResultEngine, group_balances, group_detail,
};

use super::Engine;

impl Engine {
    /// Balance rollup of every group matching `query`.
    pub async fn group_balances(
        &self,
        query: &GroupBalanceQuery,
    ) -> ResultEngine<Vec<GroupBalance>> {
        let groups = self.groups().await?;
        let balances = self.balances().await?;
        Ok(group_balances(&groups, &balances, query))
    }

    /// A group with its expenses, spending and member balances.
    pub async fn group_detail(&self, group_id: i64) -> ResultEngine<GroupDetail> {
        let group = self.group(group_id).await?;
        let expenses = self.expenses_by_group(group_id).await?;
        let balances = self.balances().await?;
        Ok(group_detail(group, expenses, &balances))
    }
}
