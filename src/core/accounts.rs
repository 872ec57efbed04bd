use crate::core::{Account, AccountNode, FlattenedAccount};
use crate::utils::error::{CommissionError, Result};
use std::collections::{HashMap, HashSet};

/// Assembles parent-linked rows into a forest ordered by account code.
///
/// Rows pointing at an unknown parent become roots. Rows that can only be
/// reached through a parent cycle are rejected.
pub fn build_account_tree(rows: Vec<Account>) -> Result<Vec<AccountNode>> {
    let known: HashSet<String> = rows.iter().map(|a| a.id.clone()).collect();
    if known.len() != rows.len() {
        return Err(CommissionError::AccountTreeError {
            message: "duplicate account id".to_string(),
        });
    }

    let mut roots = Vec::new();
    let mut children_of: HashMap<String, Vec<Account>> = HashMap::new();
    for account in rows {
        let parent_id = account.parent_id.clone();
        match parent_id.as_deref() {
            Some(parent) if known.contains(parent) && parent != account.id => {
                children_of
                    .entry(parent.to_string())
                    .or_default()
                    .push(account);
            }
            Some(parent) if parent == account.id => {
                return Err(CommissionError::AccountTreeError {
                    message: format!("account '{}' is its own parent", account.id),
                });
            }
            Some(parent) => {
                tracing::warn!(
                    "Account '{}' references missing parent '{}', treating as root",
                    account.id,
                    parent
                );
                roots.push(account);
            }
            None => roots.push(account),
        }
    }

    let mut placed = 0;
    let mut forest = Vec::with_capacity(roots.len());
    roots.sort_by(|a, b| a.code.cmp(&b.code));
    for root in roots {
        forest.push(attach_children(root, &mut children_of, &mut placed));
    }

    if placed != known.len() {
        let mut stranded: Vec<String> = children_of
            .into_values()
            .flatten()
            .map(|a| a.id)
            .collect();
        stranded.sort();
        return Err(CommissionError::AccountTreeError {
            message: format!("parent cycle among accounts: {}", stranded.join(", ")),
        });
    }

    Ok(forest)
}

fn attach_children(
    account: Account,
    children_of: &mut HashMap<String, Vec<Account>>,
    placed: &mut usize,
) -> AccountNode {
    *placed += 1;
    let mut direct = children_of.remove(&account.id).unwrap_or_default();
    direct.sort_by(|a, b| a.code.cmp(&b.code));

    let children = direct
        .into_iter()
        .map(|child| attach_children(child, children_of, placed))
        .collect();

    AccountNode { account, children }
}

/// 前序走訪，產生 (帳戶, 深度, 路徑)
pub fn flatten_accounts(roots: &[AccountNode]) -> Vec<FlattenedAccount> {
    let mut out = Vec::new();
    let mut path = Vec::new();
    for root in roots {
        flatten_into(root, 0, &mut path, &mut out, false);
    }
    out
}

/// Like [`flatten_accounts`] but keeps only active accounts. Inactive parents
/// are still descended into.
pub fn flatten_active_accounts(roots: &[AccountNode]) -> Vec<FlattenedAccount> {
    let mut out = Vec::new();
    let mut path = Vec::new();
    for root in roots {
        flatten_into(root, 0, &mut path, &mut out, true);
    }
    out
}

fn flatten_into(
    node: &AccountNode,
    depth: usize,
    path: &mut Vec<String>,
    out: &mut Vec<FlattenedAccount>,
    active_only: bool,
) {
    path.push(node.account.id.clone());
    if !active_only || node.account.is_active {
        out.push(FlattenedAccount {
            account: node.account.clone(),
            depth,
            path: path.clone(),
        });
    }
    for child in &node.children {
        flatten_into(child, depth + 1, path, out, active_only);
    }
    path.pop();
}
