/// Pending write operations and the buffer that collects them
use crate::{Entity, Error, Key, Result};

/// One write operation
#[derive(Debug, Clone, PartialEq)]
pub enum MutationOp {
    /// Insert or overwrite the entity under its key
    Upsert(Entity),
    /// Insert the entity; the store completes an incomplete final key element
    InsertAutoId(Entity),
    Delete(Key),
}

impl MutationOp {
    pub fn name(&self) -> &'static str {
        match self {
            MutationOp::Upsert(_) => "upsert",
            MutationOp::InsertAutoId(_) => "insert_auto_id",
            MutationOp::Delete(_) => "delete",
        }
    }
}

/// Ordered list of operations, applied by the store in append order
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Mutation {
    ops: Vec<MutationOp>,
}

impl Mutation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, op: MutationOp) {
        self.ops.push(op);
    }

    pub fn upsert(mut self, entity: Entity) -> Self {
        self.push(MutationOp::Upsert(entity));
        self
    }

    pub fn insert_auto_id(mut self, entity: Entity) -> Self {
        self.push(MutationOp::InsertAutoId(entity));
        self
    }

    pub fn delete(mut self, key: Key) -> Self {
        self.push(MutationOp::Delete(key));
        self
    }

    pub fn ops(&self) -> &[MutationOp] {
        &self.ops
    }

    pub fn into_ops(self) -> Vec<MutationOp> {
        self.ops
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Number of insert-with-generated-id operations.
    pub fn insert_auto_id_count(&self) -> usize {
        self.ops
            .iter()
            .filter(|op| matches!(op, MutationOp::InsertAutoId(_)))
            .count()
    }
}

impl FromIterator<MutationOp> for Mutation {
    fn from_iter<T: IntoIterator<Item = MutationOp>>(iter: T) -> Self {
        Self {
            ops: iter.into_iter().collect(),
        }
    }
}

/// Write buffer of one transaction.
///
/// Appends are purely local. The buffer is drained exactly once, at commit;
/// any use after that fails with [`Error::MutationDrained`].
#[derive(Debug, Default)]
pub struct MutationBuffer {
    mutation: Mutation,
    drained: bool,
}

impl MutationBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    fn append(&mut self, op: MutationOp) -> Result<()> {
        if self.drained {
            return Err(Error::MutationDrained);
        }
        self.mutation.push(op);
        Ok(())
    }

    pub fn add_upsert(&mut self, entity: Entity) -> Result<()> {
        self.append(MutationOp::Upsert(entity))
    }

    pub fn add_insert_auto_id(&mut self, entity: Entity) -> Result<()> {
        self.append(MutationOp::InsertAutoId(entity))
    }

    pub fn add_delete(&mut self, key: Key) -> Result<()> {
        self.append(MutationOp::Delete(key))
    }

    /// Append every operation of `ops` in order.
    pub fn extend<I>(&mut self, ops: I) -> Result<()>
    where
        I: IntoIterator<Item = MutationOp>,
    {
        for op in ops {
            self.append(op)?;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.mutation.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mutation.is_empty()
    }

    pub fn is_drained(&self) -> bool {
        self.drained
    }

    /// Take the accumulated mutation.
    pub fn drain(&mut self) -> Result<Mutation> {
        if self.drained {
            return Err(Error::MutationDrained);
        }
        self.drained = true;
        Ok(std::mem::take(&mut self.mutation))
    }
}
