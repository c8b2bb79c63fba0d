use wal::WalOp;

/// Ordered list of puts and deletes committed as one unit by
/// [`Store::write`](crate::Store::write).
///
/// Ops are applied in insertion order; a later op on the same key wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteBatch {
    ops: Vec<WalOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(
        &mut self,
        collection: impl Into<String>,
        key: impl Into<Vec<u8>>,
        value: impl Into<Vec<u8>>,
    ) -> &mut Self {
        self.ops.push(WalOp::Put {
            collection: collection.into(),
            key: key.into(),
            value: value.into(),
        });
        self
    }

    pub fn delete(&mut self, collection: impl Into<String>, key: impl Into<Vec<u8>>) -> &mut Self {
        self.ops.push(WalOp::Del {
            collection: collection.into(),
            key: key.into(),
        });
        self
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn ops(&self) -> &[WalOp] {
        &self.ops
    }

    pub(crate) fn into_ops(self) -> Vec<WalOp> {
        self.ops
    }
}
