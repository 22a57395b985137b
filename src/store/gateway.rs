use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

// Toda falha do backend compartilhado cai nessa categoria única; quem
// chama decide se propaga, dorme ou pula o ciclo. O gateway não faz retry.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("shared store operation failed: {0}")]
    Redis(#[from] redis::RedisError),
    #[error("shared store unavailable: {0}")]
    Unavailable(String),
}

// A fatia do backend compartilhado que o core consome. Tudo que toca
// estado entre réplicas passa por aqui.
#[async_trait]
pub trait SharedStore: Send + Sync {
    async fn lpush(&self, key: &str, payload: &str) -> Result<(), BackendError>;

    // Move atomicamente o tail de src para o head de dst; None = fila vazia
    async fn rpoplpush(&self, src: &str, dst: &str) -> Result<Option<String>, BackendError>;

    async fn lrem(&self, key: &str, count: isize, payload: &str) -> Result<(), BackendError>;

    async fn zadd(&self, key: &str, score: i64, member: &str) -> Result<(), BackendError>;

    // Members with score inside inclusive [min, max]; accepts -inf/+inf
    async fn zrange_by_score(
        &self,
        key: &str,
        min: &str,
        max: &str,
    ) -> Result<Vec<String>, BackendError>;

    async fn hset(&self, key: &str, field: &str, value: &str) -> Result<(), BackendError>;

    async fn hget_all(&self, key: &str) -> Result<HashMap<String, String>, BackendError>;

    // SET NX EX: returns whether this replica acquired the key
    async fn set_nx(&self, key: &str, value: &str, ttl: Duration) -> Result<bool, BackendError>;

    async fn del(&self, keys: &[String]) -> Result<(), BackendError>;

    // Roda um script server-side que responde um array plano de inteiros
    async fn eval(
        &self,
        script: &str,
        keys: &[String],
        args: &[String],
    ) -> Result<Vec<i64>, BackendError>;

    // Coleta chaves por padrão com SCAN em cursor; o purge usa para achar
    // as filas privadas dos workers
    async fn scan_match(&self, pattern: &str) -> Result<Vec<String>, BackendError>;
}

// Implementação de produção sobre Redis. Clonar é barato: o connection
// manager multiplexa e reconecta por conta própria.
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
}

impl RedisStore {
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl SharedStore for RedisStore {
    async fn lpush(&self, key: &str, payload: &str) -> Result<(), BackendError> {
        let mut conn = self.conn.clone();
        let _: () = conn.lpush(key, payload).await?;
        Ok(())
    }

    async fn rpoplpush(&self, src: &str, dst: &str) -> Result<Option<String>, BackendError> {
        let mut conn = self.conn.clone();
        let moved: Option<String> = redis::cmd("RPOPLPUSH")
            .arg(src)
            .arg(dst)
            .query_async(&mut conn)
            .await?;
        Ok(moved)
    }

    async fn lrem(&self, key: &str, count: isize, payload: &str) -> Result<(), BackendError> {
        let mut conn = self.conn.clone();
        let _: () = conn.lrem(key, count, payload).await?;
        Ok(())
    }

    async fn zadd(&self, key: &str, score: i64, member: &str) -> Result<(), BackendError> {
        let mut conn = self.conn.clone();
        let _: () = conn.zadd(key, member, score).await?;
        Ok(())
    }

    async fn zrange_by_score(
        &self,
        key: &str,
        min: &str,
        max: &str,
    ) -> Result<Vec<String>, BackendError> {
        let mut conn = self.conn.clone();
        let members: Vec<String> = conn.zrangebyscore(key, min, max).await?;
        Ok(members)
    }

    async fn hset(&self, key: &str, field: &str, value: &str) -> Result<(), BackendError> {
        let mut conn = self.conn.clone();
        let _: () = conn.hset(key, field, value).await?;
        Ok(())
    }

    async fn hget_all(&self, key: &str) -> Result<HashMap<String, String>, BackendError> {
        let mut conn = self.conn.clone();
        let map: HashMap<String, String> = conn.hgetall(key).await?;
        Ok(map)
    }

    async fn set_nx(&self, key: &str, value: &str, ttl: Duration) -> Result<bool, BackendError> {
        let mut conn = self.conn.clone();
        let acquired: bool = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("NX")
            .arg("EX")
            .arg(ttl.as_secs())
            .query_async(&mut conn)
            .await?;
        Ok(acquired)
    }

    async fn del(&self, keys: &[String]) -> Result<(), BackendError> {
        if keys.is_empty() {
            return Ok(());
        }
        let mut conn = self.conn.clone();
        let _: () = conn.del(keys.to_vec()).await?;
        Ok(())
    }

    async fn eval(
        &self,
        script: &str,
        keys: &[String],
        args: &[String],
    ) -> Result<Vec<i64>, BackendError> {
        let mut conn = self.conn.clone();
        let mut cmd = redis::cmd("EVAL");
        cmd.arg(script).arg(keys.len());
        for key in keys {
            cmd.arg(key);
        }
        for arg in args {
            cmd.arg(arg);
        }
        let reply: Vec<i64> = cmd.query_async(&mut conn).await?;
        Ok(reply)
    }

    async fn scan_match(&self, pattern: &str) -> Result<Vec<String>, BackendError> {
        let mut conn = self.conn.clone();
        let mut cursor: u64 = 0;
        let mut keys = Vec::new();
        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(100)
                .query_async(&mut conn)
                .await?;
            keys.extend(batch);
            if next == 0 {
                break;
            }
            cursor = next;
        }
        Ok(keys)
    }
}
